//! Mock gateway for testing.
//!
//! Provides a configurable implementation of [`RemoteRailwayGateway`] that
//! records every call, so tests can assert on what would have gone over the
//! network.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{ApiError, ApiResult};
use crate::gateway::RemoteRailwayGateway;
use crate::models::{ApiResponse, Railway, StationClearJudgementBody};

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    FetchRailway { railway_id: u64 },
    ReportStationResult {
        railway_id: u64,
        body: StationClearJudgementBody,
    },
}

/// Mock gateway for testing.
#[derive(Clone)]
pub struct MockGateway {
    /// Railway returned by fetch_railway.
    railway: Arc<RwLock<Option<Railway>>>,
    /// Envelope returned by report_station_result.
    report_response: Arc<RwLock<ApiResponse<serde_json::Value>>>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<GatewayCall>>>,
    /// Simulated transport failure (HTTP status).
    simulate_failure: Arc<RwLock<Option<u16>>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Create a mock gateway with no railway and a successful report response.
    pub fn new() -> Self {
        Self {
            railway: Arc::new(RwLock::new(None)),
            report_response: Arc::new(RwLock::new(ApiResponse::success(serde_json::Value::Null))),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the railway to return.
    pub fn with_railway(self, railway: Railway) -> Self {
        *self.railway.write() = Some(railway);
        self
    }

    /// Replace the railway to return on the next fetch.
    pub fn set_railway(&self, railway: Railway) {
        *self.railway.write() = Some(railway);
    }

    /// Set the envelope returned for reports.
    pub fn with_report_response(self, response: ApiResponse<serde_json::Value>) -> Self {
        *self.report_response.write() = response;
        self
    }

    /// Fail every call with the given HTTP status.
    pub fn simulate_failure(self, status: u16) -> Self {
        *self.simulate_failure.write() = Some(status);
        self
    }

    /// Stop failing calls.
    pub fn recover(&self) {
        *self.simulate_failure.write() = None;
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<GatewayCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Get the verdicts that were submitted.
    pub fn reports(&self) -> Vec<StationClearJudgementBody> {
        self.captured_calls
            .read()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::ReportStationResult { body, .. } => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// Get the number of fetches made.
    pub fn fetch_count(&self) -> usize {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| matches!(c, GatewayCall::FetchRailway { .. }))
            .count()
    }

    fn record_call(&self, call: GatewayCall) {
        self.captured_calls.write().push(call);
    }

    fn check_failure(&self) -> ApiResult<()> {
        if let Some(status) = *self.simulate_failure.read() {
            return Err(ApiError::Status {
                status,
                body: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteRailwayGateway for MockGateway {
    async fn fetch_railway(&self, railway_id: u64) -> ApiResult<Railway> {
        self.record_call(GatewayCall::FetchRailway { railway_id });
        self.check_failure()?;

        match self.railway.read().clone() {
            Some(railway) => Ok(railway),
            None => Err(ApiError::MissingData {
                code: "404".to_string(),
                message: "railway not found".to_string(),
            }),
        }
    }

    async fn report_station_result(
        &self,
        railway_id: u64,
        body: &StationClearJudgementBody,
    ) -> ApiResult<ApiResponse<serde_json::Value>> {
        self.record_call(GatewayCall::ReportStationResult {
            railway_id,
            body: body.clone(),
        });
        self.check_failure()?;
        Ok(self.report_response.read().clone())
    }
}
