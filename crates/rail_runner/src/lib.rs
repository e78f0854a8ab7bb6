//! # rail_runner
//!
//! Drives the external test engine for one station test at a time and keeps
//! the outcome in a durable run record, so a run started before a restart can
//! still be observed after it.
//!
//! # Features
//!
//! - **Coordinator**: `Idle -> Running -> Completed -> Idle` with a durable slot
//! - **Tagged run record**: fresh results are distinguishable from restored ones
//! - **Filters**: `category:`, `group:` and `test:` selectors
//! - **Engines**: external harness process, plus a mock engine for tests
//! - **Stores**: file-backed and in-memory key-value stores
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rail_manifest::StationTest;
//! use rail_runner::{CommandEngine, CommandEngineOptions, FileKvStore, TestCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(CommandEngine::new(CommandEngineOptions::new("unity-test-harness")));
//!     let store = Arc::new(FileKvStore::open(".techtrain/state/prefs.json")?);
//!     let coordinator = TestCoordinator::new(engine, store);
//!
//!     coordinator.run_test(&StationTest::new("unity", "category:Station1"), 1).await?;
//!     coordinator.wait_for_test_result().await;
//!     println!("passed: {}", coordinator.is_test_successful(1));
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod filter;
pub mod mock;
pub mod results;
pub mod state;
pub mod store;

pub use command::{CommandEngine, CommandEngineOptions};
pub use coordinator::{FreshResults, RunInfo, TestCoordinator};
pub use engine::{RunCallbacks, TestEngine};
pub use error::{RunnerError, RunnerResult};
pub use filter::{TestFilter, TestMode, TestSelector};
pub use mock::MockEngine;
pub use results::{flatten_results, ResultNode, TestResult, TestStatus};
pub use state::{Origin, RunState, RunStateRepository};
pub use store::{FileKvStore, KvStore, MemoryKvStore};
