//! Test run coordination.
//!
//! The coordinator owns the run record. It marks a run as in flight before
//! the engine is asked to start, so a crash between start and finish is
//! visible on the next startup, and it stores whatever the engine reports
//! back through its completion callback.
//!
//! # Run lifecycle
//!
//! 1. **Idle**: nothing recorded.
//! 2. **Running**: `run_test` persisted the order and the in-flight flag.
//! 3. **Completed**: the engine reported; results are persisted.
//! 4. **Idle** again after `clear_test_results`.
//!
//! A record read back at startup is tagged restored. A restored run that is
//! still marked in flight is handed to the engine's `reattach`, and stays
//! `Running` until the engine reports or the caller abandons it by clearing
//! or starting a new run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rail_manifest::StationTest;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::{RunCallbacks, TestEngine};
use crate::error::RunnerResult;
use crate::filter::TestFilter;
use crate::results::{flatten_results, ResultNode, TestResult};
use crate::state::{Origin, RunState, RunStateRepository};
use crate::store::KvStore;

/// Bookkeeping for a run started by this process.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub order: u32,
    pub filter: TestFilter,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunInfo {
    fn new(order: u32, filter: TestFilter) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            order,
            filter,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Run duration, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Results of a run this process just executed, not yet reported.
///
/// Only the coordinator can hand these out, and only once per run.
#[derive(Debug, Clone)]
pub struct FreshResults {
    order: u32,
    results: Vec<TestResult>,
    run_id: Option<Uuid>,
}

impl FreshResults {
    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// At least one result, and every result passed.
    pub fn is_clear(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.is_passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.is_passed)
    }
}

struct CoordinatorState {
    run: RunState,
    info: Option<RunInfo>,
}

struct Inner {
    repository: RunStateRepository,
    state: Mutex<CoordinatorState>,
    running: watch::Sender<bool>,
}

impl Inner {
    fn complete(&self, tree: &ResultNode) {
        let results = flatten_results(tree);

        let mut guard = self.state.lock();
        let order = match guard.run {
            RunState::Running { order, .. } => order,
            _ => {
                warn!("Ignoring test results for '{}': no run in flight", tree.name);
                return;
            }
        };

        let passed = results.iter().filter(|r| r.is_passed).count();
        info!(
            "Test run for station {} finished: {}/{} passed",
            order,
            passed,
            results.len()
        );

        let next = RunState::Completed {
            order,
            results,
            origin: Origin::Fresh,
        };
        if let Err(e) = self.repository.save(&next) {
            error!("Failed to persist test results for station {}: {}", order, e);
        }
        guard.run = next;
        if let Some(info) = guard.info.as_mut() {
            info.finished_at = Some(Utc::now());
        }
        drop(guard);

        self.running.send_replace(false);
    }
}

impl RunCallbacks for Inner {
    fn run_started(&self, filter: &TestFilter) {
        debug!("Test run started: {}", filter);
    }

    fn run_finished(&self, result: ResultNode) {
        self.complete(&result);
    }
}

/// Runs station tests through an engine and keeps the durable run record.
pub struct TestCoordinator {
    engine: Arc<dyn TestEngine>,
    inner: Arc<Inner>,
}

impl TestCoordinator {
    /// Create a coordinator, restoring any run record found in `store`.
    pub fn new(engine: Arc<dyn TestEngine>, store: Arc<dyn KvStore>) -> Self {
        let repository = RunStateRepository::new(store);
        let run = repository.load();
        let in_flight = run.is_running();
        if in_flight {
            warn!(
                "A test run for station {} was in flight before restart",
                run.order()
            );
        }

        let (running, _) = watch::channel(in_flight);
        let inner = Arc::new(Inner {
            repository,
            state: Mutex::new(CoordinatorState { run, info: None }),
            running,
        });
        engine.register_callbacks(inner.clone());
        if in_flight {
            engine.reattach();
        }

        Self { engine, inner }
    }

    /// Start a run of `test` for the station at `order`.
    ///
    /// The in-flight record is persisted before the engine is invoked. An
    /// engine that fails to start is recorded as a failing result, not
    /// returned as an error. Callers must not start a run while another is
    /// in flight: the single slot is overwritten.
    pub async fn run_test(&self, test: &StationTest, order: u32) -> RunnerResult<()> {
        let filter = TestFilter::for_test(test);
        let run_info = RunInfo::new(order, filter.clone());

        {
            let mut guard = self.inner.state.lock();
            if guard.run.is_running() {
                warn!(
                    "Overwriting in-flight run for station {}",
                    guard.run.order()
                );
            }
            let next = RunState::Running {
                order,
                origin: Origin::Fresh,
            };
            self.inner.repository.save(&next)?;
            guard.run = next;
            guard.info = Some(run_info.clone());
        }
        self.inner.running.send_replace(true);

        info!(
            "Running '{}' for station {} on {} (run {})",
            test.display_name(),
            order,
            self.engine.name(),
            run_info.run_id
        );

        if let Err(e) = self.engine.execute(filter).await {
            error!("Test engine failed to start: {}", e);
            self.inner
                .complete(&ResultNode::failed(test.display_name(), e.to_string()));
        }

        Ok(())
    }

    /// Wait until no run is in flight. Returns immediately when idle.
    pub async fn wait_for_test_result(&self) {
        // The receiver sees the current value, so a completion that lands
        // before this point is not missed.
        let mut rx = self.inner.running.subscribe();
        let _ = rx.wait_for(|running| !*running).await;
    }

    /// Like [`wait_for_test_result`](Self::wait_for_test_result), giving up
    /// after `timeout`. Returns whether the run finished.
    pub async fn wait_for_test_result_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_for_test_result())
            .await
            .is_ok()
    }

    /// True iff the record belongs to `order`, has results, and all passed.
    pub fn is_test_successful(&self, order: u32) -> bool {
        self.inner.state.lock().run.is_successful(order)
    }

    /// Wipe the run record. Also abandons a run still marked in flight.
    pub fn clear_test_results(&self) -> RunnerResult<()> {
        {
            let mut guard = self.inner.state.lock();
            self.inner.repository.clear()?;
            guard.run = RunState::Idle;
            guard.info = None;
        }
        self.inner.running.send_replace(false);
        debug!("Cleared test results");
        Ok(())
    }

    /// Hand out the results of a freshly completed run, once.
    ///
    /// Returns `None` while running, when idle, when the record was restored
    /// from a previous session, or when the results were already claimed.
    pub fn claim_fresh_results(&self) -> Option<FreshResults> {
        let mut guard = self.inner.state.lock();
        let run_id = guard.info.as_ref().map(|i| i.run_id);
        match &mut guard.run {
            RunState::Completed {
                order,
                results,
                origin,
            } if *origin == Origin::Fresh => {
                *origin = Origin::Reported;
                Some(FreshResults {
                    order: *order,
                    results: results.clone(),
                    run_id,
                })
            }
            _ => None,
        }
    }

    /// Snapshot of the run record.
    pub fn state(&self) -> RunState {
        self.inner.state.lock().run.clone()
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.inner.state.lock().run.results().to_vec()
    }

    pub fn order(&self) -> u32 {
        self.inner.state.lock().run.order()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().run.is_running()
    }

    pub fn is_restored(&self) -> bool {
        self.inner.state.lock().run.is_restored()
    }

    /// The last run started by this process.
    pub fn last_run(&self) -> Option<RunInfo> {
        self.inner.state.lock().info.clone()
    }
}
