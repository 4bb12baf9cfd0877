mod agents;
mod cli;
mod config;
mod error;
mod prompt;
mod utils;
mod workflow;

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use config::RunConfig;
use std::process;

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe {
            std::env::set_var("DRUPDATE_VERBOSE", "1");
        }
    }

    let config = match RunConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    if let Err(e) = workflow::execute_update(&config) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
