//! Local grading eligibility.

use std::fmt;

use rail_api::{ConfirmationMethod, RailwayStation};
use rail_manifest::{ManifestStation, StationTest};

/// Executor type the local engine understands.
pub const LOCAL_EXECUTOR_TYPE: &str = "unity";

/// Why a station has to be graded outside the local runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalReason {
    ConfirmationMethod(ConfirmationMethod),
    /// Local grading needs exactly one test.
    TestCount(usize),
    ExecutorType(String),
}

impl fmt::Display for ExternalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalReason::ConfirmationMethod(method) => {
                write!(f, "station is graded by {}", method)
            }
            ExternalReason::TestCount(count) => {
                write!(f, "station defines {} tests, expected exactly 1", count)
            }
            ExternalReason::ExecutorType(kind) => {
                write!(f, "test type '{}' cannot run locally", kind)
            }
        }
    }
}

/// Outcome of the eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility<'a> {
    Local(&'a StationTest),
    External(ExternalReason),
}

/// Reject stations that are not unit-test graded, before any manifest is
/// looked at.
pub fn check_confirmation(station: &RailwayStation) -> Result<(), ExternalReason> {
    match station.confirmation_method {
        ConfirmationMethod::UnitTest => Ok(()),
        other => Err(ExternalReason::ConfirmationMethod(other)),
    }
}

/// Decide whether `station` can be graded by running `manifest` locally.
pub fn check_eligibility<'a>(
    station: &RailwayStation,
    manifest: &'a ManifestStation,
) -> Eligibility<'a> {
    if let Err(reason) = check_confirmation(station) {
        return Eligibility::External(reason);
    }

    let test = match manifest.single_test() {
        Some(test) => test,
        None => return Eligibility::External(ExternalReason::TestCount(manifest.tests.len())),
    };

    if test.test_type != LOCAL_EXECUTOR_TYPE {
        return Eligibility::External(ExternalReason::ExecutorType(test.test_type.clone()));
    }

    Eligibility::Local(test)
}
