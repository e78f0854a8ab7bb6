//! Railway progress models returned by the v3 API.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How a station is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMethod {
    UnitTest,
    Form,
    Meeting,
}

impl ConfirmationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnitTest => "unit_test",
            Self::Form => "form",
            Self::Meeting => "meeting",
        }
    }
}

impl fmt::Display for ConfirmationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Plan required to attempt a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Free,
    Paid,
}

/// Learner progress on a single station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStationStatus {
    NotChallenging,
    Challenging,
    Completed,
}

impl UserStationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotChallenging => "not_challenging",
            Self::Challenging => "challenging",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for UserStationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Present only on stations the learner has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRailwayStation {
    pub status: UserStationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationClearCondition {
    pub id: u64,
    pub contents: String,
}

/// A station as the server sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailwayStation {
    pub id: u64,
    /// 1-based position within the railway.
    pub order: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sub_title: String,
    #[serde(default)]
    pub description: String,
    pub confirmation_method: ConfirmationMethod,
    #[serde(default)]
    pub railway_station_clear_conditions: Vec<StationClearCondition>,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub user_railway_station: Option<UserRailwayStation>,
}

impl RailwayStation {
    pub fn new(id: u64, order: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            order,
            title: title.into(),
            sub_title: String::new(),
            description: String::new(),
            confirmation_method: ConfirmationMethod::UnitTest,
            railway_station_clear_conditions: Vec::new(),
            access_level: AccessLevel::Free,
            user_railway_station: None,
        }
    }

    pub fn confirmation_method(mut self, method: ConfirmationMethod) -> Self {
        self.confirmation_method = method;
        self
    }

    pub fn access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = level;
        self
    }

    pub fn status(mut self, status: UserStationStatus) -> Self {
        self.user_railway_station = Some(UserRailwayStation { status });
        self
    }

    /// Progress status, if the learner has begun this station.
    pub fn user_status(&self) -> Option<UserStationStatus> {
        self.user_railway_station.map(|s| s.status)
    }

    pub fn is_started(&self) -> bool {
        self.user_railway_station.is_some()
    }
}

/// A railway with the learner's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Railway {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sub_title: String,
    pub total_stations_count: u32,
    pub clear_stations_count: u32,
    /// Already in traversal order.
    #[serde(default)]
    pub railway_stations: Vec<RailwayStation>,
}

/// A broken invariant in a fetched railway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelViolation {
    ClearExceedsTotal { clear: u32, total: u32 },
    DuplicateOrder(u32),
    OrderNotAscending { previous: u32, next: u32 },
}

impl fmt::Display for ModelViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClearExceedsTotal { clear, total } => {
                write!(f, "clear_stations_count {} exceeds total_stations_count {}", clear, total)
            }
            Self::DuplicateOrder(order) => write!(f, "duplicate station order {}", order),
            Self::OrderNotAscending { previous, next } => {
                write!(f, "station order {} follows {}", next, previous)
            }
        }
    }
}

impl Railway {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            sub_title: String::new(),
            total_stations_count: 0,
            clear_stations_count: 0,
            railway_stations: Vec::new(),
        }
    }

    /// Append a station; the total count follows the station list.
    pub fn station(mut self, station: RailwayStation) -> Self {
        self.railway_stations.push(station);
        self.total_stations_count = self.railway_stations.len() as u32;
        self
    }

    pub fn cleared(mut self, count: u32) -> Self {
        self.clear_stations_count = count;
        self
    }

    pub fn first_station(&self) -> Option<&RailwayStation> {
        self.railway_stations.first()
    }

    pub fn station_by_order(&self, order: u32) -> Option<&RailwayStation> {
        self.railway_stations.iter().find(|s| s.order == order)
    }

    /// Check the invariants the server is expected to uphold.
    pub fn validate(&self) -> Vec<ModelViolation> {
        let mut violations = Vec::new();

        if self.clear_stations_count > self.total_stations_count {
            violations.push(ModelViolation::ClearExceedsTotal {
                clear: self.clear_stations_count,
                total: self.total_stations_count,
            });
        }

        let mut seen = HashSet::new();
        let mut previous: Option<u32> = None;
        for station in &self.railway_stations {
            if !seen.insert(station.order) {
                violations.push(ModelViolation::DuplicateOrder(station.order));
            } else if let Some(prev) = previous {
                if station.order < prev {
                    violations.push(ModelViolation::OrderNotAscending {
                        previous: prev,
                        next: station.order,
                    });
                }
            }
            previous = Some(station.order);
        }

        violations
    }
}

/// The envelope every v3 endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: "0".to_string(),
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Success is signalled by code `"0"` together with message `"success"`.
    pub fn is_success(&self) -> bool {
        self.code == "0" && self.message == "success"
    }
}

/// Verdict for one station attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationClearJudgementBody {
    pub order: u32,
    pub is_clear: bool,
    pub error_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAILWAY_JSON: &str = r#"{
        "id": 12,
        "title": "Unity Basics",
        "sub_title": "",
        "total_stations_count": 3,
        "clear_stations_count": 1,
        "railway_stations": [
            {
                "id": 1, "order": 1, "title": "Hello",
                "confirmation_method": "unit_test",
                "access_level": "free",
                "railway_station_clear_conditions": [{"id": 1, "contents": "Passes"}],
                "user_railway_station": {"status": "completed"}
            },
            {
                "id": 2, "order": 2, "title": "Move",
                "confirmation_method": "form",
                "access_level": "paid",
                "user_railway_station": {"status": "challenging"}
            },
            {
                "id": 3, "order": 3, "title": "Jump",
                "confirmation_method": "meeting",
                "access_level": "paid",
                "user_railway_station": null
            }
        ]
    }"#;

    #[test]
    fn test_railway_deserializes() {
        let railway: Railway = serde_json::from_str(RAILWAY_JSON).unwrap();
        assert_eq!(railway.id, 12);
        assert_eq!(railway.railway_stations.len(), 3);

        let second = &railway.railway_stations[1];
        assert_eq!(second.confirmation_method, ConfirmationMethod::Form);
        assert_eq!(second.access_level, AccessLevel::Paid);
        assert_eq!(second.user_status(), Some(UserStationStatus::Challenging));
        assert!(!railway.railway_stations[2].is_started());
        assert!(railway.validate().is_empty());
    }

    #[test]
    fn test_envelope_success_needs_code_and_message() {
        let ok: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"code": "0", "message": "success", "data": null}"#).unwrap();
        assert!(ok.is_success());

        let wrong_message: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"code": "0", "message": "ok"}"#).unwrap();
        assert!(!wrong_message.is_success());

        let wrong_code = ApiResponse::<()>::failure("400", "success");
        assert!(!wrong_code.is_success());
    }

    #[test]
    fn test_validate_reports_violations() {
        let railway = Railway::new(1, "broken")
            .station(RailwayStation::new(1, 2, "b"))
            .station(RailwayStation::new(2, 1, "a"))
            .station(RailwayStation::new(3, 1, "dup"))
            .cleared(5);

        let violations = railway.validate();
        assert!(violations.contains(&ModelViolation::ClearExceedsTotal { clear: 5, total: 3 }));
        assert!(violations.contains(&ModelViolation::OrderNotAscending { previous: 2, next: 1 }));
        assert!(violations.contains(&ModelViolation::DuplicateOrder(1)));
    }

    #[test]
    fn test_judgement_body_wire_format() {
        let body = StationClearJudgementBody {
            order: 2,
            is_clear: false,
            error_content: "T1\nboom\n".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["order"], 2);
        assert_eq!(json["is_clear"], false);
        assert_eq!(json["error_content"], "T1\nboom\n");
    }
}
