//! Translation of manifest test commands into engine filters.

use std::fmt;

use rail_manifest::StationTest;
use serde::{Deserialize, Serialize};

const CATEGORY_PREFIX: &str = "category:";
const GROUP_PREFIX: &str = "group:";
const TEST_PREFIX: &str = "test:";

/// Where the engine runs the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestMode {
    PlayMode,
    EditMode,
}

impl TestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlayMode => "PlayMode",
            Self::EditMode => "EditMode",
        }
    }
}

/// Which tests the engine selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestSelector {
    Categories(Vec<String>),
    Groups(Vec<String>),
    TestNames(Vec<String>),
}

/// A filter handed to the test engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFilter {
    pub mode: TestMode,
    pub selector: TestSelector,
}

impl TestFilter {
    /// Parse a manifest command.
    ///
    /// `category:`, `group:` and `test:` select by category, group or test
    /// name with the prefix stripped. Anything else is taken whole as a test
    /// name.
    pub fn from_command(command: &str) -> Self {
        let selector = if let Some(category) = command.strip_prefix(CATEGORY_PREFIX) {
            TestSelector::Categories(vec![category.to_string()])
        } else if let Some(group) = command.strip_prefix(GROUP_PREFIX) {
            TestSelector::Groups(vec![group.to_string()])
        } else if let Some(name) = command.strip_prefix(TEST_PREFIX) {
            TestSelector::TestNames(vec![name.to_string()])
        } else {
            TestSelector::TestNames(vec![command.to_string()])
        };

        Self {
            mode: TestMode::PlayMode,
            selector,
        }
    }

    /// Filter for a station test.
    pub fn for_test(test: &StationTest) -> Self {
        Self::from_command(&test.command)
    }

    /// Command-line arguments understood by the test harness.
    pub fn to_args(&self) -> Vec<String> {
        let (flag, values) = match &self.selector {
            TestSelector::Categories(v) => ("--category", v),
            TestSelector::Groups(v) => ("--group", v),
            TestSelector::TestNames(v) => ("--test", v),
        };

        let mut args = vec!["--test-platform".to_string(), self.mode.as_str().to_string()];
        for value in values {
            args.push(flag.to_string());
            args.push(value.clone());
        }
        args
    }
}

impl fmt::Display for TestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, values) = match &self.selector {
            TestSelector::Categories(v) => ("category", v),
            TestSelector::Groups(v) => ("group", v),
            TestSelector::TestNames(v) => ("test", v),
        };
        write!(f, "{} {}={}", self.mode.as_str(), kind, values.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_select_and_strip() {
        assert_eq!(
            TestFilter::from_command("category:Station1").selector,
            TestSelector::Categories(vec!["Station1".to_string()])
        );
        assert_eq!(
            TestFilter::from_command("group:Movement").selector,
            TestSelector::Groups(vec!["Movement".to_string()])
        );
        assert_eq!(
            TestFilter::from_command("test:Cube.Moves").selector,
            TestSelector::TestNames(vec!["Cube.Moves".to_string()])
        );
    }

    #[test]
    fn test_bare_command_is_test_name() {
        let filter = TestFilter::from_command("Tests.Station1.Passes");
        assert_eq!(filter.mode, TestMode::PlayMode);
        assert_eq!(
            filter.selector,
            TestSelector::TestNames(vec!["Tests.Station1.Passes".to_string()])
        );
    }

    #[test]
    fn test_unknown_prefix_is_kept_whole() {
        let filter = TestFilter::from_command("suite:Foo");
        assert_eq!(
            filter.selector,
            TestSelector::TestNames(vec!["suite:Foo".to_string()])
        );
    }

    #[test]
    fn test_filter_from_station_test() {
        let test = StationTest::new("unity", "group:Physics");
        assert_eq!(
            TestFilter::for_test(&test).to_args(),
            vec!["--test-platform", "PlayMode", "--group", "Physics"]
        );
    }

    #[test]
    fn test_display() {
        let filter = TestFilter::from_command("category:A");
        assert_eq!(filter.to_string(), "PlayMode category=A");
    }
}
