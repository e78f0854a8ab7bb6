//! HTTP gateway against the v3 railway API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::gateway::RemoteRailwayGateway;
use crate::models::{ApiResponse, Railway, StationClearJudgementBody};

/// Default v2 API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.techtrain.dev/api/v2";

/// Default v3 API endpoint.
pub const DEFAULT_API_ENDPOINT_V3: &str = "https://api.techtrain.dev/api/v3";

/// HTTP gateway options.
#[derive(Debug, Clone)]
pub struct HttpGatewayOptions {
    /// Base URL of the v3 API
    pub endpoint_v3: String,
    /// Bearer token, sent when present
    pub token: Option<String>,
    /// User-Agent header value
    pub user_agent: String,
    /// Request timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
}

impl Default for HttpGatewayOptions {
    fn default() -> Self {
        Self {
            endpoint_v3: DEFAULT_API_ENDPOINT_V3.to_string(),
            token: None,
            user_agent: "TechtrainRailway".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl HttpGatewayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint_v3(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_v3 = endpoint.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Gateway talking to the railway server over HTTPS.
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint_v3: String,
    token: Option<String>,
}

impl HttpGateway {
    /// Build a gateway from options.
    pub fn new(options: HttpGatewayOptions) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&options.user_agent)
            .map_err(|e| ApiError::InvalidConfig(format!("user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if options.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(options.timeout_seconds));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint_v3: options.endpoint_v3.trim_end_matches('/').to_string(),
            token: options.token.filter(|t| !t.is_empty()),
        })
    }

    fn railway_url(&self, railway_id: u64) -> String {
        format!("{}/techtrain/user/railways/{}", self.endpoint_v3, railway_id)
    }

    fn judgement_url(&self, railway_id: u64) -> String {
        format!("{}/station_clear_judgement", self.railway_url(railway_id))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ApiResult<ApiResponse<T>> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(envelope) => Ok(envelope),
            // An error page is more useful than the decode error it causes.
            Err(_) if !status.is_success() => Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RemoteRailwayGateway for HttpGateway {
    async fn fetch_railway(&self, railway_id: u64) -> ApiResult<Railway> {
        let url = self.railway_url(railway_id);
        debug!("GET {}", url);

        let envelope: ApiResponse<Railway> = self.send(self.client.get(&url)).await?;
        match envelope.data {
            Some(railway) => Ok(railway),
            None => {
                warn!(
                    "Railway {} response without data: code={} message={}",
                    railway_id, envelope.code, envelope.message
                );
                Err(ApiError::MissingData {
                    code: envelope.code,
                    message: envelope.message,
                })
            }
        }
    }

    async fn report_station_result(
        &self,
        railway_id: u64,
        body: &StationClearJudgementBody,
    ) -> ApiResult<ApiResponse<serde_json::Value>> {
        let url = self.judgement_url(railway_id);
        debug!("POST {} (order={}, is_clear={})", url, body.order, body.is_clear);

        self.send(self.client.post(&url).json(body)).await
    }
}
