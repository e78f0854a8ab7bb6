//! Integration tests for the gateway contract using the mock gateway.

use rail_api::{
    AccessLevel, ApiResponse, ConfirmationMethod, GatewayCall, MockGateway, Railway,
    RailwayStation, RemoteRailwayGateway, StationClearJudgementBody, UserStationStatus,
};

fn sample_railway() -> Railway {
    Railway::new(12, "Unity Basics")
        .station(RailwayStation::new(1, 1, "Hello").status(UserStationStatus::Completed))
        .station(
            RailwayStation::new(2, 2, "Move")
                .access_level(AccessLevel::Paid)
                .status(UserStationStatus::Challenging),
        )
        .station(RailwayStation::new(3, 3, "Essay").confirmation_method(ConfirmationMethod::Form))
        .cleared(1)
}

/// The gateway can be used through a trait object.
#[tokio::test]
async fn test_gateway_as_trait_object() {
    let mock = MockGateway::new().with_railway(sample_railway());
    let gateway: Box<dyn RemoteRailwayGateway> = Box::new(mock.clone());

    let railway = gateway.fetch_railway(12).await.unwrap();
    assert_eq!(railway.total_stations_count, 3);
    assert_eq!(railway.clear_stations_count, 1);
    assert!(railway.validate().is_empty());
    assert_eq!(mock.call_count(), 1);
}

/// A rejected report is returned as an envelope, not an error.
#[tokio::test]
async fn test_rejected_report_is_an_envelope() {
    let mock = MockGateway::new()
        .with_report_response(ApiResponse::failure("1001", "station is not challenging"));

    let body = StationClearJudgementBody {
        order: 2,
        is_clear: false,
        error_content: "T1\nboom\n".to_string(),
    };
    let response = mock.report_station_result(12, &body).await.unwrap();

    assert!(!response.is_success());
    assert_eq!(response.code, "1001");
    assert_eq!(
        mock.get_calls(),
        vec![GatewayCall::ReportStationResult { railway_id: 12, body }]
    );
}

/// Envelopes decode with and without data.
#[test]
fn test_envelope_decoding() {
    let json = r#"{
        "code": "0",
        "message": "success",
        "data": {
            "id": 4, "title": "T", "total_stations_count": 0,
            "clear_stations_count": 0, "railway_stations": []
        }
    }"#;
    let envelope: ApiResponse<Railway> = serde_json::from_str(json).unwrap();
    assert!(envelope.is_success());
    assert_eq!(envelope.data.unwrap().id, 4);

    let empty: ApiResponse<Railway> =
        serde_json::from_str(r#"{"code": "500", "message": "error"}"#).unwrap();
    assert!(empty.data.is_none());
}
