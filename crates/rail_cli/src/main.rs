//! rail CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Setup failure (manifest or config)
//! - 4: Network failure
//! - 5: Tests failed

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod context;

use commands::{Cli, Commands, GlobalArgs, TestsFailed};
use config::ConfigError;
use rail_core::CoreError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const SETUP_FAILURE: u8 = 3;
    pub const NETWORK_FAILURE: u8 = 4;
    pub const TESTS_FAILED: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version also arrive here.
            return if e.use_stderr() {
                ExitCode::from(ExitCodes::INVALID_ARGS)
            } else {
                ExitCode::from(ExitCodes::SUCCESS)
            };
        }
    };

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let mut filter = EnvFilter::from_default_env();
    for directive in [format!("rail={}", level), "warn".to_string()] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let global = GlobalArgs::from(&cli);
    let result = match cli.command {
        Commands::Status(args) => commands::status::execute(&global, args).await,
        Commands::Run(args) => commands::run::execute(&global, args).await,
        Commands::Wait(args) => commands::wait::execute(&global, args).await,
        Commands::Clear(args) => commands::clear::execute(&global, args).await,
        Commands::Config(args) => commands::config::execute(&global, args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            if exit_code == ExitCodes::TESTS_FAILED {
                eprintln!("❌ {:#}", e);
            } else {
                eprintln!("❌ Error: {:#}", e);
            }
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<TestsFailed>().is_some() {
            return ExitCodes::TESTS_FAILED;
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ExitCodes::SETUP_FAILURE;
        }
        if let Some(core) = cause.downcast_ref::<CoreError>() {
            return match core {
                CoreError::RemoteFetchFailed { .. } => ExitCodes::NETWORK_FAILURE,
                CoreError::ManifestUnavailable(_) | CoreError::NotInitialized => {
                    ExitCodes::SETUP_FAILURE
                }
                CoreError::Runner(_) => ExitCodes::GENERAL_ERROR,
            };
        }
    }

    ExitCodes::GENERAL_ERROR
}
