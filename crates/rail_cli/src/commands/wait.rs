//! Wait command - Pick up a test run left over from an earlier invocation.

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use rail_core::ResumeOutcome;

use super::run::finish;
use super::GlobalArgs;
use crate::context::AppContext;

#[derive(Args)]
pub struct WaitArgs {
    /// Give up after this many seconds (default: wait indefinitely)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// List every result, not only failures
    #[arg(long)]
    all: bool,
}

pub async fn execute(global: &GlobalArgs, args: WaitArgs) -> Result<()> {
    let ctx = AppContext::load(global.config.as_deref(), &global.project)?;
    let mut session = ctx.session().await?;

    if session.coordinator().is_running() {
        println!(
            "⏳ Waiting for the test run of station {}...",
            session.coordinator().order()
        );
    }

    match session.resume(args.timeout.map(Duration::from_secs)).await? {
        ResumeOutcome::NothingToResume => {
            println!("No test run to pick up.");
            Ok(())
        }
        ResumeOutcome::TimedOut { order } => {
            anyhow::bail!(
                "Timed out waiting for station {}; use `rail clear` to abandon the run",
                order
            )
        }
        ResumeOutcome::Finished(attempt) => finish(attempt, args.all, global.quiet),
    }
}
