//! Railway progress resolution.
//!
//! The manager joins the remote railway snapshot with the local manifests.
//! The two sides only share the station `order`; the join always goes
//! through the manifest's order to file mapping.

use std::fmt;
use std::sync::Arc;

use rail_api::{
    AccessLevel, Railway, RailwayStation, RemoteRailwayGateway, StationClearJudgementBody,
    UserStationStatus,
};
use rail_manifest::{ManifestRailway, ManifestStation, ManifestStore};
use rail_runner::{FreshResults, RunState, TestCoordinator, TestResult};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};

/// Why a verdict was not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotInitialized,
    NoResults,
    StillRunning,
    /// The run record came from a previous session.
    Restored,
    AlreadyReported,
    OrderMismatch { requested: u32, recorded: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotInitialized => write!(f, "railway not loaded"),
            SkipReason::NoResults => write!(f, "no test results"),
            SkipReason::StillRunning => write!(f, "tests still running"),
            SkipReason::Restored => write!(f, "results restored from a previous session"),
            SkipReason::AlreadyReported => write!(f, "results already reported"),
            SkipReason::OrderMismatch {
                requested,
                recorded,
            } => write!(
                f,
                "results belong to station {}, not station {}",
                recorded, requested
            ),
        }
    }
}

/// What happened to a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Skipped(SkipReason),
    Accepted,
    Rejected { code: String, message: String },
    /// Transport or decode failure. Not retried.
    NoResponse(String),
}

impl ReportOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ReportOutcome::Accepted)
    }
}

/// Joins remote progress with local manifests and reports verdicts.
pub struct RailwayManager {
    gateway: Arc<dyn RemoteRailwayGateway>,
    manifests: ManifestStore,
    is_user_paid: bool,
    manifest: Option<ManifestRailway>,
    railway: Option<Railway>,
}

impl RailwayManager {
    pub fn new(
        gateway: Arc<dyn RemoteRailwayGateway>,
        manifests: ManifestStore,
        is_user_paid: bool,
    ) -> Self {
        Self {
            gateway,
            manifests,
            is_user_paid,
            manifest: None,
            railway: None,
        }
    }

    /// Load the railway manifest and fetch the matching remote railway.
    ///
    /// Every call replaces the previous snapshot. On failure the snapshot is
    /// dropped, so a stale railway is never served after a failed reload.
    pub async fn initialize(&mut self) -> CoreResult<()> {
        self.railway = None;
        self.manifest = None;

        let manifest = self.manifests.get_railway()?;
        let railway_id = manifest.railway_id;
        debug!(
            "Loaded manifest for railway {} ({} stations mapped)",
            railway_id,
            manifest.station_count()
        );

        let railway = self
            .gateway
            .fetch_railway(railway_id)
            .await
            .map_err(|source| CoreError::RemoteFetchFailed { railway_id, source })?;

        for violation in railway.validate() {
            warn!("Railway {} is inconsistent: {}", railway_id, violation);
        }

        info!(
            "Railway {} '{}': {}/{} stations cleared",
            railway.id, railway.title, railway.clear_stations_count, railway.total_stations_count
        );

        self.manifest = Some(manifest);
        self.railway = Some(railway);
        Ok(())
    }

    /// Alias of [`initialize`](Self::initialize).
    pub async fn reload(&mut self) -> CoreResult<()> {
        self.initialize().await
    }

    pub fn is_initialized(&self) -> bool {
        self.railway.is_some() && self.manifest.is_some()
    }

    pub fn railway(&self) -> Option<&Railway> {
        self.railway.as_ref()
    }

    pub fn manifest(&self) -> Option<&ManifestRailway> {
        self.manifest.as_ref()
    }

    pub fn manifest_store(&self) -> &ManifestStore {
        &self.manifests
    }

    pub fn is_user_paid(&self) -> bool {
        self.is_user_paid
    }

    pub fn is_all_stations_cleared(&self) -> bool {
        self.railway
            .as_ref()
            .map(|r| r.clear_stations_count == r.total_stations_count)
            .unwrap_or(false)
    }

    /// Whether the learner has started the railway.
    ///
    /// Only the first station is inspected; progression is assumed to be
    /// strictly sequential.
    pub fn is_already_challenging(&self) -> bool {
        self.railway
            .as_ref()
            .and_then(Railway::first_station)
            .map(RailwayStation::is_started)
            .unwrap_or(false)
    }

    /// The first station in list order that has progress and is not
    /// completed. The list order is the traversal order; it is never
    /// re-sorted.
    pub fn get_current_station(&self) -> Option<&RailwayStation> {
        self.railway
            .as_ref()?
            .railway_stations
            .iter()
            .find(|s| {
                s.user_status()
                    .is_some_and(|status| status != UserStationStatus::Completed)
            })
    }

    pub fn is_station_permitted(&self, station: &RailwayStation) -> bool {
        match station.access_level {
            AccessLevel::Free => true,
            AccessLevel::Paid => self.is_user_paid,
        }
    }

    /// Local manifest of the station at `order`, or `None` if it is not
    /// mapped or cannot be read.
    pub fn get_manifest_station(&self, order: u32) -> Option<ManifestStation> {
        let manifest = self.manifest.as_ref()?;
        match self.manifests.load_mapped_station(manifest, order) {
            Ok(station) => Some(station),
            Err(e) => {
                warn!("Station manifest for order {} unavailable: {}", order, e);
                None
            }
        }
    }

    pub fn get_current_station_manifest(&self) -> Option<ManifestStation> {
        let order = self.get_current_station()?.order;
        self.get_manifest_station(order)
    }

    /// Send the verdict of the coordinator's last run for the station at
    /// `order`.
    ///
    /// Only results produced by this process are sent, and only once. A
    /// restored record is never reported. Failures are logged and returned
    /// as an outcome; nothing is retried.
    pub async fn report_station_result(
        &self,
        order: u32,
        coordinator: &TestCoordinator,
    ) -> ReportOutcome {
        let Some(railway) = self.railway.as_ref() else {
            return Self::skip(order, SkipReason::NotInitialized);
        };

        match coordinator.state() {
            RunState::Idle => return Self::skip(order, SkipReason::NoResults),
            RunState::Running { .. } => return Self::skip(order, SkipReason::StillRunning),
            RunState::Completed {
                order: recorded, ..
            } if recorded != order => {
                return Self::skip(
                    order,
                    SkipReason::OrderMismatch {
                        requested: order,
                        recorded,
                    },
                )
            }
            RunState::Completed { .. } => {}
        }

        if coordinator.is_restored() {
            return Self::skip(order, SkipReason::Restored);
        }
        let Some(fresh) = coordinator.claim_fresh_results() else {
            return Self::skip(order, SkipReason::AlreadyReported);
        };

        let body = judgement_body(&fresh);
        info!(
            "Reporting station {} of railway {}: clear={}",
            order, railway.id, body.is_clear
        );

        match self.gateway.report_station_result(railway.id, &body).await {
            Ok(response) if response.is_success() => {
                info!(
                    "Station {} verdict accepted: code={} message={} data={:?}",
                    order, response.code, response.message, response.data
                );
                ReportOutcome::Accepted
            }
            Ok(response) => {
                warn!(
                    "Station {} verdict rejected: code={} message={}",
                    order, response.code, response.message
                );
                ReportOutcome::Rejected {
                    code: response.code,
                    message: response.message,
                }
            }
            Err(e) => {
                warn!("Station {} verdict not delivered: {}", order, e);
                ReportOutcome::NoResponse(e.to_string())
            }
        }
    }

    fn skip(order: u32, reason: SkipReason) -> ReportOutcome {
        debug!("Not reporting station {}: {}", order, reason);
        ReportOutcome::Skipped(reason)
    }
}

fn judgement_body(fresh: &FreshResults) -> StationClearJudgementBody {
    StationClearJudgementBody {
        order: fresh.order(),
        is_clear: fresh.is_clear(),
        error_content: error_content(fresh.failures()),
    }
}

/// `path`, newline, message, newline for each failure.
pub fn error_content<'a>(failures: impl IntoIterator<Item = &'a TestResult>) -> String {
    failures
        .into_iter()
        .map(|r| {
            format!(
                "{}\n{}\n",
                r.path,
                r.error_message.as_deref().unwrap_or_default()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use rail_api::{ApiError, ApiResponse, ApiResult};
    use rail_manifest::StationTest;
    use rail_runner::{MemoryKvStore, MockEngine, ResultNode};
    use std::fs;
    use tempfile::TempDir;

    mock! {
        pub Gateway {}

        #[async_trait]
        impl RemoteRailwayGateway for Gateway {
            async fn fetch_railway(&self, railway_id: u64) -> ApiResult<Railway>;
            async fn report_station_result(
                &self,
                railway_id: u64,
                body: &StationClearJudgementBody,
            ) -> ApiResult<ApiResponse<serde_json::Value>>;
        }
    }

    fn three_stations() -> Railway {
        Railway::new(7, "Intro")
            .station(RailwayStation::new(1, 1, "One").status(UserStationStatus::Completed))
            .station(RailwayStation::new(2, 2, "Two").status(UserStationStatus::Challenging))
            .station(RailwayStation::new(3, 3, "Three"))
            .cleared(1)
    }

    fn manifests(railway_id: u64) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("railway.json"),
            format!(
                r#"{{"railwayId": {}, "stations": {{"2": "two.json"}}}}"#,
                railway_id
            ),
        )
        .unwrap();
        fs::write(
            temp.path().join("two.json"),
            r#"{"name": "Two", "id": 2, "tests": [{"type": "unity", "command": "category:Two"}]}"#,
        )
        .unwrap();
        temp
    }

    fn fetching(railway: Railway) -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_railway()
            .with(eq(railway.id))
            .returning(move |_| Ok(railway.clone()));
        gateway
    }

    async fn loaded(gateway: MockGateway, temp: &TempDir, paid: bool) -> RailwayManager {
        let mut manager =
            RailwayManager::new(Arc::new(gateway), ManifestStore::new(temp.path()), paid);
        manager.initialize().await.unwrap();
        manager
    }

    async fn finished_run(order: u32, tree: ResultNode) -> TestCoordinator {
        let engine = MockEngine::new().add_response(tree);
        let coordinator = TestCoordinator::new(Arc::new(engine), Arc::new(MemoryKvStore::new()));
        coordinator
            .run_test(&StationTest::new("unity", "T1"), order)
            .await
            .unwrap();
        coordinator.wait_for_test_result().await;
        coordinator
    }

    #[tokio::test]
    async fn test_current_station_is_first_unfinished() {
        let temp = manifests(7);
        let manager = loaded(fetching(three_stations()), &temp, false).await;

        assert!(manager.is_initialized());
        assert!(manager.is_already_challenging());
        assert!(!manager.is_all_stations_cleared());
        assert_eq!(manager.get_current_station().unwrap().order, 2);
    }

    #[tokio::test]
    async fn test_current_station_follows_list_order() {
        let temp = manifests(7);
        let railway = Railway::new(7, "Shuffled")
            .station(RailwayStation::new(2, 2, "Two").status(UserStationStatus::Challenging))
            .station(RailwayStation::new(1, 1, "One").status(UserStationStatus::Challenging));
        let manager = loaded(fetching(railway), &temp, false).await;

        assert_eq!(manager.get_current_station().unwrap().order, 2);
        assert_eq!(
            manager.railway().and_then(Railway::first_station).unwrap().order,
            2
        );
        assert!(manager.is_already_challenging());
        assert_eq!(manager.get_current_station_manifest().unwrap().name, "Two");
    }

    #[tokio::test]
    async fn test_current_station_none_when_nothing_started() {
        let temp = manifests(7);
        let railway = Railway::new(7, "Fresh")
            .station(RailwayStation::new(1, 1, "One"))
            .station(RailwayStation::new(2, 2, "Two"));
        let manager = loaded(fetching(railway), &temp, false).await;

        assert!(!manager.is_already_challenging());
        assert!(manager.get_current_station().is_none());
        assert!(manager.get_current_station_manifest().is_none());
    }

    #[tokio::test]
    async fn test_all_cleared_iff_counts_match() {
        let temp = manifests(7);
        let railway = Railway::new(7, "Done")
            .station(RailwayStation::new(1, 1, "One").status(UserStationStatus::Completed))
            .cleared(1);
        let manager = loaded(fetching(railway), &temp, false).await;
        assert!(manager.is_all_stations_cleared());

        let uninitialized = RailwayManager::new(
            Arc::new(MockGateway::new()),
            ManifestStore::new(temp.path()),
            false,
        );
        assert!(!uninitialized.is_all_stations_cleared());
        assert!(uninitialized.get_current_station().is_none());
    }

    #[test]
    fn test_permission_depends_on_access_level_and_plan() {
        let free = RailwayStation::new(1, 1, "Free");
        let paid = RailwayStation::new(2, 2, "Paid").access_level(AccessLevel::Paid);
        let temp = manifests(7);

        for paid_plan in [false, true] {
            let manager = RailwayManager::new(
                Arc::new(MockGateway::new()),
                ManifestStore::new(temp.path()),
                paid_plan,
            );
            for status in [
                None,
                Some(UserStationStatus::Challenging),
                Some(UserStationStatus::Completed),
            ] {
                let (mut f, mut p) = (free.clone(), paid.clone());
                if let Some(status) = status {
                    f = f.status(status);
                    p = p.status(status);
                }
                assert!(manager.is_station_permitted(&f));
                assert_eq!(manager.is_station_permitted(&p), paid_plan);
            }
        }
    }

    #[tokio::test]
    async fn test_current_station_manifest_follows_mapping() {
        let temp = manifests(7);
        let manager = loaded(fetching(three_stations()), &temp, false).await;

        let station = manager.get_current_station_manifest().unwrap();
        assert_eq!(station.name, "Two");
        assert_eq!(station.tests[0].command, "category:Two");
        assert!(manager.get_manifest_station(3).is_none());
    }

    #[tokio::test]
    async fn test_initialize_without_manifest_fails() {
        let temp = TempDir::new().unwrap();
        let mut gateway = MockGateway::new();
        gateway.expect_fetch_railway().never();

        let mut manager =
            RailwayManager::new(Arc::new(gateway), ManifestStore::new(temp.path()), false);
        let err = manager.initialize().await.unwrap_err();
        assert!(matches!(err, CoreError::ManifestUnavailable(_)));
        assert!(!manager.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_fetch_failure_drops_snapshot() {
        let temp = manifests(7);
        let railway = three_stations();
        let mut gateway = MockGateway::new();
        let mut calls = 0;
        gateway.expect_fetch_railway().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(railway.clone())
            } else {
                Err(ApiError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            }
        });

        let mut manager =
            RailwayManager::new(Arc::new(gateway), ManifestStore::new(temp.path()), false);
        manager.initialize().await.unwrap();
        assert!(manager.is_initialized());

        let err = manager.reload().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::RemoteFetchFailed { railway_id: 7, .. }
        ));
        assert!(err.is_transient());
        assert!(!manager.is_initialized());
        assert!(manager.get_current_station().is_none());
    }

    #[tokio::test]
    async fn test_report_single_failure() {
        let temp = manifests(7);
        let mut gateway = fetching(three_stations());
        gateway
            .expect_report_station_result()
            .withf(|id, body| {
                *id == 7
                    && body.order == 2
                    && !body.is_clear
                    && body.error_content == "/T1\nboom\n"
            })
            .times(1)
            .returning(|_, _| Ok(ApiResponse::success(serde_json::Value::Null)));
        let manager = loaded(gateway, &temp, false).await;

        let coordinator = finished_run(2, ResultNode::failed("T1", "boom")).await;
        let outcome = manager.report_station_result(2, &coordinator).await;
        assert_eq!(outcome, ReportOutcome::Accepted);
    }

    #[test]
    fn test_error_content_format() {
        let results = [TestResult::failed("T1", "boom")];
        assert_eq!(error_content(&results), "T1\nboom\n");

        let results = [
            TestResult::failed("/N/A", "expected 1"),
            TestResult {
                path: "/N/B".to_string(),
                is_passed: false,
                error_message: None,
            },
        ];
        assert_eq!(error_content(&results), "/N/A\nexpected 1\n/N/B\n\n");
        assert_eq!(error_content(&Vec::<TestResult>::new()), "");
    }

    #[tokio::test]
    async fn test_report_passing_run_is_clear() {
        let temp = manifests(7);
        let mut gateway = fetching(three_stations());
        gateway
            .expect_report_station_result()
            .withf(|_, body| body.is_clear && body.error_content.is_empty())
            .times(1)
            .returning(|_, _| Ok(ApiResponse::success(serde_json::json!({"cleared": true}))));
        let manager = loaded(gateway, &temp, false).await;

        let tree = ResultNode::suite("N", vec![ResultNode::passed("A"), ResultNode::passed("B")]);
        let coordinator = finished_run(2, tree).await;
        assert!(manager
            .report_station_result(2, &coordinator)
            .await
            .is_accepted());
    }

    #[tokio::test]
    async fn test_report_is_sent_once() {
        let temp = manifests(7);
        let mut gateway = fetching(three_stations());
        gateway
            .expect_report_station_result()
            .times(1)
            .returning(|_, _| Ok(ApiResponse::success(serde_json::Value::Null)));
        let manager = loaded(gateway, &temp, false).await;

        let coordinator = finished_run(2, ResultNode::passed("T1")).await;
        assert!(manager
            .report_station_result(2, &coordinator)
            .await
            .is_accepted());
        assert_eq!(
            manager.report_station_result(2, &coordinator).await,
            ReportOutcome::Skipped(SkipReason::AlreadyReported)
        );
    }

    #[tokio::test]
    async fn test_restored_run_is_never_reported() {
        let temp = manifests(7);
        let mut gateway = fetching(three_stations());
        gateway.expect_report_station_result().never();
        let manager = loaded(gateway, &temp, false).await;

        let store = Arc::new(MemoryKvStore::new());
        {
            let engine = MockEngine::new().add_response(ResultNode::failed("T1", "boom"));
            let first = TestCoordinator::new(Arc::new(engine), store.clone());
            first
                .run_test(&StationTest::new("unity", "T1"), 2)
                .await
                .unwrap();
            first.wait_for_test_result().await;
        }
        let restored = TestCoordinator::new(Arc::new(MockEngine::new()), store);
        assert!(restored.is_restored());

        for _ in 0..2 {
            assert_eq!(
                manager.report_station_result(2, &restored).await,
                ReportOutcome::Skipped(SkipReason::Restored)
            );
        }
    }

    #[tokio::test]
    async fn test_report_skips_mismatched_order_without_claiming() {
        let temp = manifests(7);
        let mut gateway = fetching(three_stations());
        gateway.expect_report_station_result().never();
        let manager = loaded(gateway, &temp, false).await;

        let coordinator = finished_run(1, ResultNode::passed("T1")).await;
        assert_eq!(
            manager.report_station_result(2, &coordinator).await,
            ReportOutcome::Skipped(SkipReason::OrderMismatch {
                requested: 2,
                recorded: 1
            })
        );
        assert!(coordinator.claim_fresh_results().is_some());
    }

    #[tokio::test]
    async fn test_report_rejection_and_transport_failure() {
        let temp = manifests(7);
        let mut gateway = fetching(three_stations());
        let mut calls = 0;
        gateway
            .expect_report_station_result()
            .times(2)
            .returning(move |_, _| {
                calls += 1;
                if calls == 1 {
                    Ok(ApiResponse::failure("E100", "station locked"))
                } else {
                    Err(ApiError::MissingData {
                        code: "1".to_string(),
                        message: "error".to_string(),
                    })
                }
            });
        let manager = loaded(gateway, &temp, false).await;

        let first = finished_run(2, ResultNode::passed("T1")).await;
        assert_eq!(
            manager.report_station_result(2, &first).await,
            ReportOutcome::Rejected {
                code: "E100".to_string(),
                message: "station locked".to_string()
            }
        );

        let second = finished_run(2, ResultNode::passed("T1")).await;
        assert!(matches!(
            manager.report_station_result(2, &second).await,
            ReportOutcome::NoResponse(_)
        ));
    }

    #[tokio::test]
    async fn test_report_before_initialize_is_skipped() {
        let temp = manifests(7);
        let mut gateway = MockGateway::new();
        gateway.expect_report_station_result().never();
        let manager =
            RailwayManager::new(Arc::new(gateway), ManifestStore::new(temp.path()), false);

        let coordinator = finished_run(2, ResultNode::passed("T1")).await;
        assert_eq!(
            manager.report_station_result(2, &coordinator).await,
            ReportOutcome::Skipped(SkipReason::NotInitialized)
        );
    }
}
