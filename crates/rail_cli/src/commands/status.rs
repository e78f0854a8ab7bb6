//! Status command - Show the current station and the last test run.

use anyhow::Result;
use clap::Args;
use tracing::info;

use rail_core::{RailwayManager, StationView};
use rail_runner::{RunState, TestResult};

use super::GlobalArgs;
use crate::context::AppContext;

#[derive(Args)]
pub struct StatusArgs {
    /// List every result of the last run, not only failures
    #[arg(long)]
    all: bool,
}

pub async fn execute(global: &GlobalArgs, args: StatusArgs) -> Result<()> {
    let ctx = AppContext::load(global.config.as_deref(), &global.project)?;
    info!("Resolving railway status in {:?}", ctx.project);

    let session = ctx.session().await?;
    print_railway(session.manager());
    println!();
    print_view(&session.view()?);

    println!();
    print_run_state(&session.coordinator().state(), args.all);
    Ok(())
}

pub fn print_railway(manager: &RailwayManager) {
    if let Some(railway) = manager.railway() {
        println!(
            "🚃 {} ({}/{} stations cleared)",
            railway.title, railway.clear_stations_count, railway.total_stations_count
        );
    }
}

/// Explain a view to the learner.
pub fn print_view(view: &StationView) {
    match view {
        StationView::AllCleared => {
            println!("🎉 All stations cleared. Congratulations!");
        }
        StationView::NotStarted => {
            println!("🚉 This railway has not been started yet.");
            println!("   Start the first station on the TechTrain website, then run `rail status` again.");
        }
        StationView::NoCurrentStation => {
            println!("⚠️  Could not determine the current station.");
            println!("   Try again later; if this persists, check the railway on the TechTrain website.");
        }
        StationView::PaidPlanRequired { station } => {
            println!("🔒 Station {}: {}", station.order, station.title);
            println!("   This station requires a paid plan.");
        }
        StationView::ExternalGrading { station, reason } => {
            println!("🌐 Station {}: {}", station.order, station.title);
            println!("   This station is graded on the TechTrain website ({}).", reason);
        }
        StationView::ManifestMissing { station } => {
            println!("⚠️  Station {}: {}", station.order, station.title);
            println!("   No local test is defined for this station. Update the project's manifests.");
        }
        StationView::Ready { station, test, .. } => {
            println!("📋 Station {}: {}", station.order, station.title);
            if !station.sub_title.is_empty() {
                println!("   {}", station.sub_title);
            }
            for condition in &station.railway_station_clear_conditions {
                println!("   - {}", condition.contents);
            }
            println!("   Test: {}", test.display_name());
            println!("   Run `rail run` to check your work.");
        }
    }
}

pub fn print_run_state(state: &RunState, all: bool) {
    match state {
        RunState::Idle => println!("No local test run recorded."),
        RunState::Running { order, .. } => {
            println!("⏳ A test run for station {} is in flight.", order);
            println!("   Use `rail wait` to pick it up or `rail clear` to abandon it.");
        }
        RunState::Completed { order, results, .. } => {
            let passed = results.iter().filter(|r| r.is_passed).count();
            let icon = if state.is_successful(*order) { "✅" } else { "❌" };
            println!(
                "{} Last run for station {}: {}/{} passed{}",
                icon,
                order,
                passed,
                results.len(),
                if state.is_restored() { " (from an earlier session)" } else { "" }
            );
            print_results(results, all);
        }
    }
}

pub fn print_results(results: &[TestResult], all: bool) {
    for result in results {
        if result.is_passed {
            if all {
                println!("   ✅ {}", result.path);
            }
            continue;
        }
        println!("   ❌ {}", result.path);
        if let Some(message) = &result.error_message {
            for line in message.lines() {
                println!("      {}", line);
            }
        }
    }
}
