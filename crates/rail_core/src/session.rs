//! Station session flow.
//!
//! A [`RailwaySession`] pairs the manager with the coordinator and drives a
//! station attempt end to end: resolve what the learner should see, run the
//! station test, wait for the verdict, report it, and advance.

use std::time::Duration;

use rail_api::RailwayStation;
use rail_manifest::{ManifestStation, StationTest};
use rail_runner::{RunState, TestCoordinator, TestResult};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::gate::{check_confirmation, check_eligibility, Eligibility, ExternalReason};
use crate::manager::{RailwayManager, ReportOutcome};

/// What the learner is presented with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationView {
    AllCleared,
    /// The railway has to be started from the website first.
    NotStarted,
    /// Progress exists but no station is open; usually a stale snapshot.
    NoCurrentStation,
    PaidPlanRequired { station: RailwayStation },
    ExternalGrading {
        station: RailwayStation,
        reason: ExternalReason,
    },
    ManifestMissing { station: RailwayStation },
    Ready {
        station: RailwayStation,
        manifest: ManifestStation,
        test: StationTest,
    },
}

impl StationView {
    pub fn is_ready(&self) -> bool {
        matches!(self, StationView::Ready { .. })
    }

    pub fn station(&self) -> Option<&RailwayStation> {
        match self {
            StationView::PaidPlanRequired { station }
            | StationView::ExternalGrading { station, .. }
            | StationView::ManifestMissing { station }
            | StationView::Ready { station, .. } => Some(station),
            _ => None,
        }
    }
}

/// Verdict of one station attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationAttempt {
    pub order: u32,
    pub results: Vec<TestResult>,
    pub passed: bool,
    pub report: ReportOutcome,
    /// Local results were cleared and the railway reloaded.
    pub advanced: bool,
}

/// Result of [`RailwaySession::run_current`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The current station cannot be run locally.
    NotRunnable(StationView),
    /// Another run is still in flight.
    Busy { order: u32 },
    Finished(StationAttempt),
}

/// Result of [`RailwaySession::resume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    NothingToResume,
    TimedOut { order: u32 },
    Finished(StationAttempt),
}

/// Manager and coordinator driven together.
pub struct RailwaySession {
    manager: RailwayManager,
    coordinator: TestCoordinator,
}

impl RailwaySession {
    pub fn new(manager: RailwayManager, coordinator: TestCoordinator) -> Self {
        Self {
            manager,
            coordinator,
        }
    }

    pub fn manager(&self) -> &RailwayManager {
        &self.manager
    }

    pub fn coordinator(&self) -> &TestCoordinator {
        &self.coordinator
    }

    pub async fn reload(&mut self) -> CoreResult<()> {
        self.manager.reload().await
    }

    /// Resolve the current view.
    ///
    /// Checks run in a fixed order; the first one that applies wins.
    pub fn view(&self) -> CoreResult<StationView> {
        let manager = &self.manager;
        if !manager.is_initialized() {
            return Err(CoreError::NotInitialized);
        }

        if manager.is_all_stations_cleared() {
            return Ok(StationView::AllCleared);
        }
        if !manager.is_already_challenging() {
            return Ok(StationView::NotStarted);
        }

        let Some(station) = manager.get_current_station().cloned() else {
            return Ok(StationView::NoCurrentStation);
        };
        if !manager.is_station_permitted(&station) {
            return Ok(StationView::PaidPlanRequired { station });
        }
        if let Err(reason) = check_confirmation(&station) {
            return Ok(StationView::ExternalGrading { station, reason });
        }

        let Some(manifest) = manager.get_manifest_station(station.order) else {
            return Ok(StationView::ManifestMissing { station });
        };
        let test = match check_eligibility(&station, &manifest) {
            Eligibility::Local(test) => test.clone(),
            Eligibility::External(reason) => {
                return Ok(StationView::ExternalGrading { station, reason })
            }
        };

        Ok(StationView::Ready {
            station,
            manifest,
            test,
        })
    }

    /// Run the current station's test and settle its verdict.
    ///
    /// On a pass the local record is cleared and the railway reloaded so the
    /// next station becomes current. A run started by this process is never
    /// interrupted; one left in flight by an earlier process is replaced.
    pub async fn run_current(&mut self) -> CoreResult<RunOutcome> {
        if self.coordinator.is_running() {
            let order = self.coordinator.order();
            if !self.coordinator.is_restored() {
                return Ok(RunOutcome::Busy { order });
            }
            warn!(
                "Replacing the unfinished run of station {} from an earlier session",
                order
            );
        }

        let (order, test) = match self.view()? {
            StationView::Ready { station, test, .. } => (station.order, test),
            other => return Ok(RunOutcome::NotRunnable(other)),
        };

        self.coordinator.run_test(&test, order).await?;
        self.coordinator.wait_for_test_result().await;

        let attempt = self.settle(order).await?;
        Ok(RunOutcome::Finished(attempt))
    }

    /// Pick up a run left over from earlier.
    ///
    /// An in-flight run is waited for, up to `timeout` when given. A
    /// completed record is settled like a fresh run; restored results are
    /// never reported, but a restored pass still advances.
    pub async fn resume(&mut self, timeout: Option<Duration>) -> CoreResult<ResumeOutcome> {
        let order = match self.coordinator.state() {
            RunState::Idle => return Ok(ResumeOutcome::NothingToResume),
            RunState::Running { order, .. } => {
                info!("Waiting for the test run of station {}", order);
                let finished = match timeout {
                    Some(timeout) => {
                        self.coordinator
                            .wait_for_test_result_timeout(timeout)
                            .await
                    }
                    None => {
                        self.coordinator.wait_for_test_result().await;
                        true
                    }
                };
                if !finished {
                    warn!("Test run of station {} is still in flight", order);
                    return Ok(ResumeOutcome::TimedOut { order });
                }
                // A clear while waiting also ends the wait.
                if self.coordinator.state() == RunState::Idle {
                    return Ok(ResumeOutcome::NothingToResume);
                }
                order
            }
            RunState::Completed { order, .. } => order,
        };

        let attempt = self.settle(order).await?;
        Ok(ResumeOutcome::Finished(attempt))
    }

    async fn settle(&mut self, order: u32) -> CoreResult<StationAttempt> {
        let results = self.coordinator.results();
        let passed = self.coordinator.is_test_successful(order);
        let report = self
            .manager
            .report_station_result(order, &self.coordinator)
            .await;
        debug!("Station {} report outcome: {:?}", order, report);

        let advanced = if passed {
            self.coordinator.clear_test_results()?;
            self.manager.reload().await?;
            info!("Station {} passed", order);
            true
        } else {
            info!("Station {} failed", order);
            false
        };

        Ok(StationAttempt {
            order,
            results,
            passed,
            report,
            advanced,
        })
    }

    pub fn into_parts(self) -> (RailwayManager, TestCoordinator) {
        (self.manager, self.coordinator)
    }
}
