//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// Gantry asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Task to run (see --list)
    #[arg(default_value = "default")]
    pub task: String,

    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: gantry.toml, searched upward)
    #[arg(short = 'C', long, default_value = "gantry.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// List the available tasks and exit
    #[arg(short, long)]
    pub list: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_task() {
        let cli = Cli::parse_from(["gantry"]);
        assert_eq!(cli.task, "default");
        assert_eq!(cli.config, PathBuf::from("gantry.toml"));
        assert!(!cli.list);
    }

    #[test]
    fn test_named_task_with_options() {
        let cli = Cli::parse_from(["gantry", "-V", "-C", "web/gantry.toml", "build-app-prod"]);
        assert_eq!(cli.task, "build-app-prod");
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("web/gantry.toml"));
    }
}
