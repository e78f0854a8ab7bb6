//! Clear command - Discard the local test run record.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::GlobalArgs;
use crate::context::AppContext;

#[derive(Args)]
pub struct ClearArgs {}

pub async fn execute(global: &GlobalArgs, _args: ClearArgs) -> Result<()> {
    let ctx = AppContext::load(global.config.as_deref(), &global.project)?;
    let repository = ctx.run_state()?;

    let state = repository.load();
    if state.is_running() {
        info!("Abandoning in-flight run for station {}", state.order());
    }
    repository.clear().context("Failed to clear test results")?;

    println!("🧹 Cleared local test results");
    Ok(())
}
