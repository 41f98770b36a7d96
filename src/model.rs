//! Domain types shared between the gateway and the synchronization core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a test step or of a whole execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(alias = "passed")]
    Passed,
    #[serde(alias = "failed")]
    Failed,
    #[serde(alias = "pending")]
    Pending,
    Calculated,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Passed => "Passed",
            Verdict::Failed => "Failed",
            Verdict::Pending => "Pending",
            Verdict::Calculated => "Calculated",
        };
        f.write_str(s)
    }
}

/// Remote execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    New,
    InProgress,
    Blocked,
    Paused,
    Finished,
    Closed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::New => "New",
            ExecutionStatus::InProgress => "InProgress",
            ExecutionStatus::Blocked => "Blocked",
            ExecutionStatus::Paused => "Paused",
            ExecutionStatus::Finished => "Finished",
            ExecutionStatus::Closed => "Closed",
        };
        f.write_str(s)
    }
}

/// Reporting session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Authenticated session against the remote service.
///
/// Exists only between a successful login and the matching logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub tenant_id: i64,
    pub product_id: i64,
    pub user_id: i64,
}

/// Remote grouping of all executions produced by one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportingSession {
    pub id: i64,
    pub name: String,
}

/// Local test case definition, supplied once per completed test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseDefinition {
    #[serde(default)]
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_steps: Vec<String>,
    /// Per-test override of the global update policy
    #[serde(default)]
    pub overwrite: Option<bool>,
    #[serde(default = "default_mark_for_review")]
    pub mark_for_review: bool,
}

fn default_mark_for_review() -> bool {
    true
}

impl TestCaseDefinition {
    pub fn new(external_id: &str, name: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            name: name.to_string(),
            description: None,
            test_steps: Vec::new(),
            overwrite: None,
            mark_for_review: true,
        }
    }

    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A test step as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteStep {
    pub id: i64,
    pub text: String,
}

/// Verdict assigned to a single remote step of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: i64,
    pub verdict: Verdict,
}

/// Requirement grouping the test cases of one `describe` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    pub name: String,
    pub test_cases: Vec<TestCaseDefinition>,
}

impl UserStory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            test_cases: Vec::new(),
        }
    }
}

/// Top-level requirement of one import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Epic {
    pub name: String,
    pub user_stories: Vec<UserStory>,
}

impl Epic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            user_stories: Vec::new(),
        }
    }

    pub fn test_cases(&self) -> impl Iterator<Item = &TestCaseDefinition> {
        self.user_stories.iter().flat_map(|s| s.test_cases.iter())
    }
}
