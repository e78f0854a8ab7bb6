//! Test engine trait and completion callbacks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RunnerResult;
use crate::filter::TestFilter;
use crate::results::ResultNode;

/// Receives run notifications from an engine.
pub trait RunCallbacks: Send + Sync {
    /// Called when a run has been started.
    fn run_started(&self, _filter: &TestFilter) {}

    /// Called once per run with the full result tree.
    fn run_finished(&self, result: ResultNode);
}

/// An external test engine.
///
/// Engines report completion through registered callbacks rather than a
/// return value: the run may outlive the call that started it.
#[async_trait]
pub trait TestEngine: Send + Sync {
    /// Register callbacks for all subsequent runs.
    fn register_callbacks(&self, callbacks: Arc<dyn RunCallbacks>);

    /// Start a run. Returns once the run is underway, not when it ends.
    async fn execute(&self, filter: TestFilter) -> RunnerResult<()>;

    /// Pick up a run started by an earlier process, reporting its result
    /// through the registered callbacks once it becomes available.
    ///
    /// Engines that cannot observe such a run leave it alone.
    fn reattach(&self) {}

    /// Engine name, for logs.
    fn name(&self) -> &str;
}
