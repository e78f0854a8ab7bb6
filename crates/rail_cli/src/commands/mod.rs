//! CLI command definitions.
//!
//! This module defines the command structure for the `rail` CLI.
//! Each subcommand maps to one step of working through a railway.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

pub mod clear;
pub mod config;
pub mod run;
pub mod status;
pub mod wait;

/// rail - work through TechTrain railways from the terminal
#[derive(Parser)]
#[command(name = "rail")]
#[command(version, about = "rail - work through TechTrain railways from the terminal")]
#[command(long_about = r#"
rail resolves your current station on a TechTrain railway, runs its test
locally, and reports the verdict back to TechTrain.

COMMANDS:
  status   → Show the current station and the last local test run
  run      → Run the current station's test and report the result
  wait     → Pick up a test run left over from an earlier invocation
  clear    → Discard the local test run record
  config   → Show or edit the user configuration

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Setup failure (manifest or config)
  4 - Network failure
  5 - Tests failed
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file (default: <data dir>/techtrain-railway/config.toml)
    #[arg(long, global = true, env = "RAIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project directory containing .techtrain/
    #[arg(short, long, global = true, default_value = ".")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current station and the last local test run
    Status(status::StatusArgs),

    /// Run the current station's test and report the result
    Run(run::RunArgs),

    /// Wait for or settle a test run left over from earlier
    Wait(wait::WaitArgs),

    /// Discard the local test run record
    Clear(clear::ClearArgs),

    /// Show or edit the user configuration
    Config(config::ConfigArgs),
}

/// Options every subcommand needs.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub project: PathBuf,
    pub quiet: bool,
}

impl From<&Cli> for GlobalArgs {
    fn from(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            project: cli.project.clone(),
            quiet: cli.quiet,
        }
    }
}

/// A station run finished with failing tests.
#[derive(Error, Debug)]
#[error("Station {order}: {failed} of {total} tests failed")]
pub struct TestsFailed {
    pub order: u32,
    pub failed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::try_parse_from(["rail", "status", "--project", "/tmp/game", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.project, PathBuf::from("/tmp/game"));
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["rail", "-v", "-q", "status"]).is_err());
    }

    #[test]
    fn test_wait_timeout() {
        let cli = Cli::try_parse_from(["rail", "wait", "--timeout", "30"]).unwrap();
        match cli.command {
            Commands::Wait(args) => assert_eq!(args.timeout, Some(30)),
            _ => panic!("expected wait"),
        }
    }

    #[test]
    fn test_config_set_token() {
        let cli = Cli::try_parse_from(["rail", "config", "set-token", "abc"]).unwrap();
        match cli.command {
            Commands::Config(args) => assert!(matches!(
                args.action,
                config::ConfigAction::SetToken { ref token } if token == "abc"
            )),
            _ => panic!("expected config"),
        }
    }
}
