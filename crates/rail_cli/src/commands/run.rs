//! Run command - Run the current station's test and report the verdict.

use anyhow::Result;
use clap::Args;
use tracing::info;

use rail_core::{ReportOutcome, RunOutcome, StationAttempt, StationView};

use super::status::{print_results, print_view};
use super::{GlobalArgs, TestsFailed};
use crate::context::AppContext;

#[derive(Args)]
pub struct RunArgs {
    /// List every result, not only failures
    #[arg(long)]
    all: bool,
}

pub async fn execute(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let ctx = AppContext::load(global.config.as_deref(), &global.project)?;
    let mut session = ctx.session().await?;

    if let Ok(StationView::Ready { station, .. }) = session.view() {
        println!("🧪 Running tests for station {}: {}", station.order, station.title);
    }

    match session.run_current().await? {
        RunOutcome::NotRunnable(view) => {
            info!("Current station cannot be run locally");
            print_view(&view);
            Ok(())
        }
        RunOutcome::Busy { order } => {
            println!("⏳ A test run for station {} is already in flight.", order);
            println!("   Use `rail wait` to pick it up or `rail clear` to abandon it.");
            Ok(())
        }
        RunOutcome::Finished(attempt) => finish(attempt, args.all, global.quiet),
    }
}

/// Print an attempt and turn a failure into an error.
pub fn finish(attempt: StationAttempt, all: bool, quiet: bool) -> Result<()> {
    let total = attempt.results.len();
    let failed = attempt.results.iter().filter(|r| !r.is_passed).count();

    if !quiet || !attempt.passed {
        print_results(&attempt.results, all);
    }
    print_report(&attempt.report);

    if attempt.passed {
        println!("✅ Station {} cleared ({} tests passed)", attempt.order, total);
        if attempt.advanced {
            println!("   Run `rail status` to see the next station.");
        }
        Ok(())
    } else {
        Err(TestsFailed {
            order: attempt.order,
            failed,
            total,
        }
        .into())
    }
}

fn print_report(report: &ReportOutcome) {
    match report {
        ReportOutcome::Accepted => println!("📨 Result sent to TechTrain"),
        ReportOutcome::Skipped(reason) => println!("📭 Result not sent: {}", reason),
        ReportOutcome::Rejected { code, message } => {
            println!("⚠️  TechTrain rejected the result ({}: {})", code, message)
        }
        ReportOutcome::NoResponse(error) => {
            println!("⚠️  Could not reach TechTrain: {}", error);
            println!("   The station stays open; run it again later.");
        }
    }
}
