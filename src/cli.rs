use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "drupdate",
    about = "Drupdate - downloads newer Drupal contrib modules and swaps them into place",
    version,
    author
)]
pub struct Cli {
    /// Path containing the installed contrib modules
    #[arg(short = 'p', long = "path", visible_alias = "contrib", value_name = "PATH")]
    pub contrib_path: Option<String>,

    /// Git username, used for the review branch name
    #[arg(short = 'u', long = "username", visible_alias = "user", value_name = "USERNAME")]
    pub username: Option<String>,

    /// Modules to update, space separated (use '*' for all)
    #[arg(short = 'm', long = "modules", value_name = "'MODULE-1 MODULE-2'")]
    pub modules: Option<String>,

    /// Path to the YAML configuration file
    #[arg(short = 'c', long = "config", default_value = "config.yml")]
    pub config: String,

    /// Skip the git branch/commit/push workflow entirely
    #[arg(long)]
    pub no_git: bool,

    /// Print each step made by the program
    #[arg(short, long)]
    pub verbose: bool,
}
