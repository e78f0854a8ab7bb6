//! Gateway trait.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{ApiResponse, Railway, StationClearJudgementBody};

/// Remote source of railway progress and sink for station verdicts.
#[async_trait]
pub trait RemoteRailwayGateway: Send + Sync {
    /// Fetch a railway together with the learner's progress.
    ///
    /// A response without data is an error: there is no usable railway.
    async fn fetch_railway(&self, railway_id: u64) -> ApiResult<Railway>;

    /// Submit a verdict for one station attempt.
    ///
    /// The envelope is returned as-is; callers decide what counts as success
    /// through [`ApiResponse::is_success`].
    async fn report_station_result(
        &self,
        railway_id: u64,
        body: &StationClearJudgementBody,
    ) -> ApiResult<ApiResponse<serde_json::Value>>;
}
