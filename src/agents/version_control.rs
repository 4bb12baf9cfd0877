use crate::error::{DrupdateError, GitFailureKind, Result};
use crate::utils::path_validator::PathValidator;
use jiff::Zoned;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Runs the optional git review workflow in the install root. Every failure
/// here is classified and reported, but never fails the module updates.
pub struct VersionControlAgent {
    work_dir: PathBuf,
}

impl VersionControlAgent {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = Self::validate_git_path(work_dir.as_ref())?;
        Ok(Self { work_dir })
    }

    /// Build the review branch name `<YYMMDD>-<username>`, sanitized to the
    /// characters git accepts everywhere.
    pub fn branch_name(username: &str) -> String {
        let date = Zoned::now().strftime("%y%m%d").to_string();
        let mut branch_name = format!("{date}-{username}");

        branch_name = branch_name
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
                _ => '-',
            })
            .collect();

        if branch_name.len() > 50 {
            branch_name.truncate(50);
        }

        branch_name
    }

    /// Refresh master and branch off it for review.
    pub fn create_update_branch(&self, username: &str) -> Result<String> {
        let branch_name = Self::branch_name(username);
        self.run_checked(&["checkout", "master"])?;
        self.run_checked(&["pull", "origin", "master"])?;
        self.run_checked(&["checkout", "-b", &branch_name])?;
        Ok(branch_name)
    }

    pub fn current_branch(&self) -> Result<String> {
        let output = self.run_git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Self::ensure_success(&output, "git rev-parse")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn stage_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_checked(&["commit", "-m", message])
    }

    pub fn push_upstream(&self, branch: &str) -> Result<()> {
        self.run_checked(&["push", "--set-upstream", "origin", branch])
    }

    fn run_checked(&self, args: &[&str]) -> Result<()> {
        let output = self.run_git(args)?;
        Self::ensure_success(&output, &format!("git {}", args.join(" ")))
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .current_dir(&self.work_dir)
            .args(args)
            .output()
            .map_err(|e| DrupdateError::Git {
                kind: GitFailureKind::Other,
                message: format!("failed to execute git {}: {e}", args.join(" ")),
            })
    }

    fn ensure_success(output: &Output, command: &str) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DrupdateError::Git {
            kind: classify_git_failure(&stderr),
            message: format!("{command} failed: {}", stderr.trim()),
        })
    }

    fn validate_git_path(path: &Path) -> Result<PathBuf> {
        let dangerous = [';', '|', '&', '$', '`', '\n', '\r'];
        let path_str = path.to_string_lossy();
        if let Some(ch) = dangerous.iter().find(|c| path_str.contains(**c)) {
            return Err(DrupdateError::Git {
                kind: GitFailureKind::Other,
                message: format!("path contains dangerous character: '{ch}'"),
            });
        }

        PathValidator::validate_install_root(path).map_err(|err| DrupdateError::Git {
            kind: GitFailureKind::Other,
            message: format!("invalid git work directory: {err}"),
        })
    }
}

/// Map git's stderr into the three failure classes the operator report
/// distinguishes.
pub fn classify_git_failure(stderr: &str) -> GitFailureKind {
    let lower = stderr.to_lowercase();

    if lower.contains("not a git repository") {
        return GitFailureKind::NotARepository;
    }

    const NETWORK_AUTH: &[&str] = &[
        "could not resolve host",
        "could not read from remote",
        "authentication failed",
        "permission denied",
        "connection timed out",
        "ssl",
    ];
    if NETWORK_AUTH.iter().any(|needle| lower.contains(needle)) {
        return GitFailureKind::NetworkAuth;
    }

    GitFailureKind::Other
}
