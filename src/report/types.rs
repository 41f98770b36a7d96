use crate::model::{TestCaseDefinition, Verdict};
use crate::sync::SyncAction;
use serde::{Deserialize, Serialize};

/// Final state of one publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishStatus {
    Published,
    /// Deliberately not published (warning)
    Skipped,
    Failed,
}

/// What happened to one local test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRecord {
    pub external_id: String,
    pub name: String,
    pub verdict: Option<Verdict>,
    pub status: PublishStatus,
    pub sync_action: Option<SyncAction>,
    pub test_case_id: Option<i64>,
    pub execution_id: Option<i64>,
    pub message: Option<String>,
}

impl PublishRecord {
    pub fn new(definition: &TestCaseDefinition, verdict: Option<Verdict>) -> Self {
        Self {
            external_id: definition.external_id.clone(),
            name: definition.name.clone(),
            verdict,
            status: PublishStatus::Published,
            sync_action: None,
            test_case_id: None,
            execution_id: None,
            message: None,
        }
    }

    pub fn skipped(mut self, reason: String) -> Self {
        self.status = PublishStatus::Skipped;
        self.message = Some(reason);
        self
    }

    pub fn failed(mut self, reason: String) -> Self {
        self.status = PublishStatus::Failed;
        self.message = Some(reason);
        self
    }
}

/// Publish results of a whole run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    pub session_name: Option<String>,
    pub records: Vec<PublishRecord>,
    pub generated_at: String,
}

impl PublishSummary {
    pub fn count(&self, status: PublishStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(PublishStatus::Failed) > 0
    }
}
