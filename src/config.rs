use crate::cli::Cli;
use crate::error::Result;
use crate::prompt;
use colored::Colorize;
use serde::Deserialize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Which modules the run should update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSelection {
    /// Update every subdirectory of the contrib path (`*`).
    All,
    Explicit(Vec<String>),
}

/// Immutable per-run configuration, built once from CLI flags, the YAML
/// config file, and interactive prompts (in that precedence order).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub install_root: PathBuf,
    pub modules: ModuleSelection,
    pub git_username: Option<String>,
    pub git_enabled: bool,
}

/// On-disk shape of config.yml. Every key is optional; missing values fall
/// through to the interactive prompts.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(rename = "git-username")]
    pub git_username: Option<String>,

    #[serde(rename = "contrib-location")]
    pub contrib_location: Option<String>,

    /// Comma-separated module names, or `*` for all.
    #[serde(rename = "modules-to-update")]
    pub modules_to_update: Option<String>,
}

impl FileConfig {
    /// Load the YAML file if it exists; a missing file is not an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

impl RunConfig {
    /// Merge CLI flags over the config file, then prompt for whatever is
    /// still missing. Prompting repeats until a non-blank value arrives.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = FileConfig::load(&cli.config)?;

        let install_root = match cli.contrib_path.clone().or(file.contrib_location.clone()) {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => PathBuf::from(prompt::ask_required(
                "\nPath containing contrib modules (ex. /home/you/drupal8/contrib):",
            )?),
        };

        let modules = match resolve_module_selection(cli, &file) {
            Some(selection) => selection,
            None => {
                let stdin = io::stdin();
                let mut input = stdin.lock();
                let mut output = io::stdout();
                prompt_module_selection(&mut input, &mut output)?
            }
        };

        let git_enabled = !cli.no_git;
        let git_username = if git_enabled {
            match cli.username.clone().or(file.git_username) {
                Some(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
                _ => Some(prompt::ask_required("\nGit username:")?),
            }
        } else {
            None
        };

        Ok(Self {
            install_root,
            modules,
            git_username,
            git_enabled,
        })
    }
}

/// Keep asking until the answer parses to a usable selection; a blank line
/// or a list with no names re-asks instead of minting a nonsense module.
fn prompt_module_selection<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<ModuleSelection> {
    loop {
        let answer = prompt::ask_with(input, output, "\nModules to update (type * for all):")?;
        if let Some(selection) = parse_module_selection(&answer, ' ') {
            return Ok(selection);
        }
        writeln!(output, "{}", "Please submit a proper value.".red())?;
    }
}

fn resolve_module_selection(cli: &Cli, file: &FileConfig) -> Option<ModuleSelection> {
    if let Some(raw) = &cli.modules {
        if let Some(selection) = parse_module_selection(raw, ' ') {
            return Some(selection);
        }
    }
    if let Some(raw) = &file.modules_to_update {
        if let Some(selection) = parse_module_selection(raw, ',') {
            return Some(selection);
        }
    }
    None
}

/// Parse a delimited module list. `*` anywhere means "all modules"; a list
/// with no usable names yields `None` so the caller can keep looking.
pub fn parse_module_selection(raw: &str, separator: char) -> Option<ModuleSelection> {
    let names: Vec<String> = raw
        .split(separator)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect();

    if names.iter().any(|name| name == "*") {
        return Some(ModuleSelection::All);
    }
    if names.is_empty() {
        return None;
    }
    Some(ModuleSelection::Explicit(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_space_separated_modules() {
        let selection = parse_module_selection("views token", ' ').unwrap();
        assert_eq!(
            selection,
            ModuleSelection::Explicit(vec!["views".into(), "token".into()])
        );
    }

    #[test]
    fn parses_comma_separated_modules_with_whitespace() {
        let selection = parse_module_selection(" views , token ", ',').unwrap();
        assert_eq!(
            selection,
            ModuleSelection::Explicit(vec!["views".into(), "token".into()])
        );
    }

    #[test]
    fn star_selects_all_modules() {
        assert_eq!(parse_module_selection("*", ' ').unwrap(), ModuleSelection::All);
        assert_eq!(
            parse_module_selection("views,*", ',').unwrap(),
            ModuleSelection::All
        );
    }

    #[test]
    fn blank_list_is_none() {
        assert!(parse_module_selection("", ' ').is_none());
        assert!(parse_module_selection("  ,  ", ',').is_none());
    }

    #[test]
    fn missing_config_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let config = FileConfig::load(dir.path().join("config.yml")).unwrap();
        assert!(config.git_username.is_none());
        assert!(config.contrib_location.is_none());
        assert!(config.modules_to_update.is_none());
    }

    fn cli_for(
        config: &Path,
        contrib_path: Option<&str>,
        username: Option<&str>,
        modules: Option<&str>,
        no_git: bool,
    ) -> Cli {
        Cli {
            contrib_path: contrib_path.map(String::from),
            username: username.map(String::from),
            modules: modules.map(String::from),
            config: config.to_string_lossy().to_string(),
            no_git,
            verbose: false,
        }
    }

    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.yml");
        fs::write(
            &path,
            "git-username: filer\ncontrib-location: /from/file\nmodules-to-update: token\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn cli_values_override_the_config_file() {
        let dir = tempdir().unwrap();
        let config_path = write_config(dir.path());
        let cli = cli_for(
            &config_path,
            Some("/from/cli"),
            Some("clier"),
            Some("views ctools"),
            false,
        );

        let config = RunConfig::resolve(&cli).unwrap();
        assert_eq!(config.install_root, PathBuf::from("/from/cli"));
        assert_eq!(config.git_username.as_deref(), Some("clier"));
        assert_eq!(
            config.modules,
            ModuleSelection::Explicit(vec!["views".into(), "ctools".into()])
        );
        assert!(config.git_enabled);
    }

    #[test]
    fn config_file_fills_in_missing_cli_values() {
        let dir = tempdir().unwrap();
        let config_path = write_config(dir.path());
        let cli = cli_for(&config_path, None, None, None, false);

        let config = RunConfig::resolve(&cli).unwrap();
        assert_eq!(config.install_root, PathBuf::from("/from/file"));
        assert_eq!(config.git_username.as_deref(), Some("filer"));
        assert_eq!(
            config.modules,
            ModuleSelection::Explicit(vec!["token".into()])
        );
    }

    #[test]
    fn no_git_skips_the_username_entirely() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "contrib-location: /from/file\n").unwrap();
        let cli = cli_for(&config_path, None, None, Some("*"), true);

        let config = RunConfig::resolve(&cli).unwrap();
        assert!(!config.git_enabled);
        assert!(config.git_username.is_none());
        assert_eq!(config.modules, ModuleSelection::All);
    }

    #[test]
    fn module_prompt_re_asks_until_a_selection_parses() {
        use std::io::Cursor;

        let mut input = Cursor::new("\n   \n*\n");
        let mut output = Vec::new();

        let selection = prompt_module_selection(&mut input, &mut output).unwrap();
        assert_eq!(selection, ModuleSelection::All);

        let rendered = String::from_utf8_lossy(&output);
        assert_eq!(rendered.matches("Modules to update").count(), 3);
        assert_eq!(rendered.matches("proper value").count(), 2);
    }

    #[test]
    fn reads_all_yaml_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "git-username: bjopling\ncontrib-location: /var/www/contrib\nmodules-to-update: views, token\n",
        )
        .unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.git_username.as_deref(), Some("bjopling"));
        assert_eq!(config.contrib_location.as_deref(), Some("/var/www/contrib"));
        assert_eq!(config.modules_to_update.as_deref(), Some("views, token"));
    }
}
