//! Mock test engine for testing.
//!
//! Records every filter it is asked to run and reports queued result trees,
//! either right away, after a delay, or when the test calls
//! [`MockEngine::finish`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::engine::{RunCallbacks, TestEngine};
use crate::error::{RunnerError, RunnerResult};
use crate::filter::TestFilter;
use crate::results::ResultNode;

/// Mock test engine.
#[derive(Clone)]
pub struct MockEngine {
    /// Registered completion callbacks.
    callbacks: Arc<RwLock<Vec<Arc<dyn RunCallbacks>>>>,
    /// Result trees reported by subsequent runs.
    responses: Arc<RwLock<VecDeque<ResultNode>>>,
    /// Filters of every executed run.
    executed: Arc<RwLock<Vec<TestFilter>>>,
    /// Whether runs report queued responses on their own.
    auto_complete: Arc<RwLock<bool>>,
    /// Delay before an automatic report, in milliseconds.
    delay_ms: Arc<RwLock<u64>>,
    /// Simulated start failure.
    simulate_failure: Arc<RwLock<Option<String>>>,
    /// Number of `reattach` calls.
    reattached: Arc<RwLock<usize>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a mock engine that completes runs automatically.
    pub fn new() -> Self {
        Self {
            callbacks: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(VecDeque::new())),
            executed: Arc::new(RwLock::new(Vec::new())),
            auto_complete: Arc::new(RwLock::new(true)),
            delay_ms: Arc::new(RwLock::new(0)),
            simulate_failure: Arc::new(RwLock::new(None)),
            reattached: Arc::new(RwLock::new(0)),
        }
    }

    /// Leave runs in flight until [`finish`](Self::finish) is called.
    pub fn manual(self) -> Self {
        *self.auto_complete.write() = false;
        self
    }

    /// Queue a result tree for the next run.
    pub fn add_response(self, response: ResultNode) -> Self {
        self.responses.write().push_back(response);
        self
    }

    /// Report automatic results after a delay.
    pub fn with_delay(self, ms: u64) -> Self {
        *self.delay_ms.write() = ms;
        self
    }

    /// Fail to start every run.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Report a result tree to every registered callback.
    pub fn finish(&self, result: ResultNode) {
        Self::notify(&self.callbacks.read().clone(), result);
    }

    /// Filters of every executed run.
    pub fn executed_filters(&self) -> Vec<TestFilter> {
        self.executed.read().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executed.read().len()
    }

    pub fn reattach_count(&self) -> usize {
        *self.reattached.read()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    fn notify(callbacks: &[Arc<dyn RunCallbacks>], result: ResultNode) {
        for callback in callbacks {
            callback.run_finished(result.clone());
        }
    }
}

#[async_trait]
impl TestEngine for MockEngine {
    fn register_callbacks(&self, callbacks: Arc<dyn RunCallbacks>) {
        self.callbacks.write().push(callbacks);
    }

    async fn execute(&self, filter: TestFilter) -> RunnerResult<()> {
        self.executed.write().push(filter.clone());

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        let callbacks = self.callbacks.read().clone();
        for callback in &callbacks {
            callback.run_started(&filter);
        }

        if !*self.auto_complete.read() {
            return Ok(());
        }
        let Some(response) = self.responses.write().pop_front() else {
            return Ok(());
        };

        let delay = *self.delay_ms.read();
        if delay == 0 {
            Self::notify(&callbacks, response);
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Self::notify(&callbacks, response);
            });
        }
        Ok(())
    }

    /// Counted only; a test reports the result with [`finish`](Self::finish).
    fn reattach(&self) {
        *self.reattached.write() += 1;
    }

    fn name(&self) -> &str {
        "mock"
    }
}
