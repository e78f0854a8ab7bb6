//! # rail_api
//!
//! Remote side of the railway: the progress models the server returns, the
//! response envelope, and the [`RemoteRailwayGateway`] trait the resolver
//! talks to.
//!
//! # Gateways
//!
//! - **HttpGateway**: `reqwest` client against the v3 API
//! - **MockGateway**: captured calls and queued responses for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use rail_api::{HttpGateway, HttpGatewayOptions, RemoteRailwayGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = HttpGateway::new(HttpGatewayOptions::default().token("secret"))?;
//!     let railway = gateway.fetch_railway(12).await?;
//!     println!("{}: {}/{}", railway.title, railway.clear_stations_count, railway.total_stations_count);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod gateway;
pub mod http;
pub mod mock;
pub mod models;

pub use error::{ApiError, ApiResult};
pub use gateway::RemoteRailwayGateway;
pub use http::{HttpGateway, HttpGatewayOptions, DEFAULT_API_ENDPOINT, DEFAULT_API_ENDPOINT_V3};
pub use mock::{GatewayCall, MockGateway};
pub use models::{
    AccessLevel, ApiResponse, ConfirmationMethod, ModelViolation, Railway, RailwayStation,
    StationClearCondition, StationClearJudgementBody, UserRailwayStation, UserStationStatus,
};
