use crate::model::{RemoteStep, Verdict};
use serde::{Deserialize, Serialize};

/// Name of the step block holding the executable steps of a structured test case
pub const TEST_STEP_BLOCK: &str = "Test";

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub access_token: String,
    pub tenant_id: i64,
    pub user_id: i64,
}

/// Kind of test case to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestCaseKind {
    StructuredTestCase,
}

/// Named block of ordered steps inside a test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepBlock {
    pub name: String,
    pub steps: Vec<RemoteStep>,
}

/// Full test case as fetched from the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTestCase {
    pub id: i64,
    pub external_id: Option<String>,
    pub blocks: Vec<StepBlock>,
}

impl RemoteTestCase {
    /// Steps of the `Test` block, in remote order. Other blocks are ignored.
    pub fn test_steps(&self) -> Vec<RemoteStep> {
        self.blocks
            .iter()
            .filter(|b| b.name == TEST_STEP_BLOCK)
            .flat_map(|b| b.steps.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionField {
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalIdField {
    pub value: Option<String>,
}

/// Partial update of a test case. Unset fields are left untouched remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<DescriptionField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsibles: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_automated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_be_reviewed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalIdField>,
}

impl TestCasePatch {
    pub fn review_only() -> Self {
        Self {
            to_be_reviewed: Some(true),
            ..Default::default()
        }
    }
}

/// Whole test case plus result, submitted as a single automation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRun {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub test_steps: Vec<String>,
    pub result: Verdict,
    pub skip_test_case_updates: bool,
}

// ---- wire payloads ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub tenant_name: &'a str,
    pub force: bool,
    pub login: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub session_token: String,
    pub tenant_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionCreatedResponse {
    pub test_session_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ElementsResponse {
    #[serde(default)]
    pub elements: Vec<ElementEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ElementEntry {
    #[serde(rename = "TestCaseSummary")]
    pub test_case_summary: Option<IdOnly>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdOnly {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestCaseResponse {
    #[serde(default)]
    pub external_id: Option<ExternalIdValue>,
    pub test_sequence: Option<TestSequence>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExternalIdValue {
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestSequence {
    #[serde(default)]
    pub test_step_blocks: Vec<TestStepBlockWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestStepBlockWire {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<TestStepWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestStepWire {
    pub id: i64,
    #[serde(default)]
    pub description: String,
}

impl TestCaseResponse {
    pub fn into_remote(self, id: i64) -> RemoteTestCase {
        let blocks = self
            .test_sequence
            .map(|seq| seq.test_step_blocks)
            .unwrap_or_default()
            .into_iter()
            .map(|b| StepBlock {
                name: b.name,
                steps: b
                    .steps
                    .into_iter()
                    .map(|s| RemoteStep {
                        id: s.id,
                        text: s.description,
                    })
                    .collect(),
            })
            .collect();

        RemoteTestCase {
            id,
            external_id: self.external_id.and_then(|e| e.value),
            blocks,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTestCaseRequest<'a> {
    pub name: &'a str,
    pub test_case_type: TestCaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_story_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestCaseCreatedResponse {
    pub test_case_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateEpicRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpicCreatedResponse {
    pub epic_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateUserStoryRequest<'a> {
    pub epic_id: i64,
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserStoryCreatedResponse {
    pub user_story_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTestStepRequest<'a> {
    pub test_step_block: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestStepCreatedResponse {
    pub test_step_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExecutionCreatedResponse {
    pub execution_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignExecutionsRequest {
    pub add_executions: Vec<AssignedExecution>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignedExecution {
    pub test_case_ids: TestCaseIdRef,
    pub execution_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestCaseIdRef {
    pub test_case_id: i64,
}
