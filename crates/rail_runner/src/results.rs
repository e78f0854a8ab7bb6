//! Engine result trees and the flat results derived from them.

use serde::{Deserialize, Serialize};

/// Outcome of a node in the engine's result tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    /// Skipped, inconclusive, or anything else the engine reports.
    #[serde(other)]
    Other,
}

/// A node of the hierarchical result tree reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultNode {
    pub name: String,
    pub status: TestStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub children: Vec<ResultNode>,
}

impl ResultNode {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            message: None,
            children: Vec::new(),
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            message: Some(message.into()),
            children: Vec::new(),
        }
    }

    /// A suite node; its status is derived from the children.
    pub fn suite(name: impl Into<String>, children: Vec<ResultNode>) -> Self {
        let status = if children.iter().all(|c| c.status == TestStatus::Passed) {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        Self {
            name: name.into(),
            status,
            message: None,
            children,
        }
    }

    pub fn with_status(mut self, status: TestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Outcome of one leaf test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Ancestor names and the leaf name, each prefixed with `/`.
    pub path: String,
    pub is_passed: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl TestResult {
    pub fn passed(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_passed: true,
            error_message: None,
        }
    }

    pub fn failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_passed: false,
            error_message: Some(message.into()),
        }
    }
}

/// Flatten a result tree into its leaves, in depth-first order.
///
/// Uses an explicit stack so deep hierarchies cannot exhaust the call stack.
pub fn flatten_results(root: &ResultNode) -> Vec<TestResult> {
    let mut results = Vec::new();
    let mut stack: Vec<(&ResultNode, String)> = vec![(root, String::new())];

    while let Some((node, prefix)) = stack.pop() {
        let path = format!("{}/{}", prefix, node.name);
        if node.is_leaf() {
            results.push(TestResult {
                path,
                is_passed: node.status == TestStatus::Passed,
                error_message: node.message.clone().filter(|m| !m.is_empty()),
            });
        } else {
            // Reversed so the first child is popped first.
            for child in node.children.iter().rev() {
                stack.push((child, path.clone()));
            }
        }
    }

    results
}
