//! # rail_core
//!
//! Progress resolution for a TechTrain railway.
//!
//! The [`RailwayManager`] joins the server's view of the learner's progress
//! with the manifests shipped in the project, answers which station is
//! current, whether it may be attempted and graded locally, and reports the
//! verdict of a local test run back to the server.
//!
//! [`RailwaySession`] drives a whole station attempt on top of it:
//!
//! ```text
//! view() ─► Ready ─► run_current() ─► run ─► wait ─► report ─► clear + reload
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rail_api::{HttpGateway, HttpGatewayOptions};
//! use rail_core::{RailwayManager, RailwaySession, RunOutcome};
//! use rail_manifest::ManifestStore;
//! use rail_runner::{CommandEngine, CommandEngineOptions, FileKvStore, TestCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(HttpGateway::new(HttpGatewayOptions::default())?);
//!     let mut manager = RailwayManager::new(gateway, ManifestStore::for_project("."), false);
//!     manager.initialize().await?;
//!
//!     let engine = Arc::new(CommandEngine::new(CommandEngineOptions::new("unity-harness")));
//!     let store = Arc::new(FileKvStore::open(".techtrain/state/prefs.json")?);
//!     let mut session = RailwaySession::new(manager, TestCoordinator::new(engine, store));
//!
//!     if let RunOutcome::Finished(attempt) = session.run_current().await? {
//!         println!("station {} passed: {}", attempt.order, attempt.passed);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod gate;
pub mod manager;
pub mod session;

pub use error::{CoreError, CoreResult};
pub use gate::{check_confirmation, check_eligibility, Eligibility, ExternalReason, LOCAL_EXECUTOR_TYPE};
pub use manager::{RailwayManager, ReportOutcome, SkipReason};
pub use session::{RailwaySession, ResumeOutcome, RunOutcome, StationAttempt, StationView};
