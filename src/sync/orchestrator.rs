use super::error::{GatewayResultExt, SyncError, Warning};
use super::outcome::Outcome;
use super::reporter::ExecutionReporter;
use super::session::{SessionContext, SessionLifecycleManager};
use super::synchronizer::{ResolvedTestCase, TestCaseSynchronizer};
use crate::gateway::RemoteGateway;
use crate::model::{Epic, TestCaseDefinition, Verdict};
use crate::report::types::{PublishRecord, PublishStatus, PublishSummary};
use crate::utils::config::{Options, ReportingMode};

/// Drives one run: `start`, one publish per test, `end`.
///
/// A publish never propagates its failure; it is recorded and the next test
/// case proceeds. Only one run may be driven at a time.
pub struct Orchestrator {
    gateway: Box<dyn RemoteGateway>,
    options: Options,
    sessions: SessionLifecycleManager,
    synchronizer: TestCaseSynchronizer,
    reporter: ExecutionReporter,
    session_name: Option<String>,
    records: Vec<PublishRecord>,
}

impl Orchestrator {
    pub fn new(gateway: Box<dyn RemoteGateway>, options: Options) -> Self {
        Self {
            synchronizer: TestCaseSynchronizer::new(&options),
            reporter: ExecutionReporter::new(&options),
            gateway,
            options,
            sessions: SessionLifecycleManager::new(),
            session_name: None,
            records: Vec::new(),
        }
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.sessions.context()
    }

    pub async fn start(&mut self) -> Result<(), SyncError> {
        let context = self
            .sessions
            .start(self.gateway.as_ref(), &self.options)
            .await?;
        self.session_name = Some(context.reporting.name.clone());
        self.records.clear();
        Ok(())
    }

    /// Synchronize the test case and report its verdict
    pub async fn publish_automated_test(
        &mut self,
        definition: &TestCaseDefinition,
        verdict: Verdict,
    ) -> PublishRecord {
        log::info!(
            "Publishing '{}' ({}): {}",
            definition.name,
            definition.external_id,
            verdict
        );
        let record = PublishRecord::new(definition, Some(verdict));

        let record = match self.options.reporting_mode {
            ReportingMode::AutomationRun => {
                self.publish_automation_run(definition, verdict, record)
                    .await
            }
            ReportingMode::Steps if self.options.skip_result_import => {
                self.synchronize(definition, None, record).await.0
            }
            ReportingMode::Steps => self.publish_steps(definition, verdict, record).await,
        };

        self.finish_record(record)
    }

    /// Synchronize the test case without reporting an execution
    pub async fn import_test_case(&mut self, definition: &TestCaseDefinition) -> PublishRecord {
        self.import_into(definition, None).await
    }

    /// Create the epic and one user story per story of `epic`, then import
    /// every test case. Newly created test cases are linked to their user story.
    ///
    /// When the epic or a user story cannot be created, the affected test cases
    /// are still imported, without a link. Nothing is created below the test
    /// cases while test case updates are disabled.
    pub async fn import_epic(&mut self, epic: &Epic) -> Vec<PublishRecord> {
        let epic_id = self.create_epic(&epic.name).await;

        let mut records = Vec::new();
        for story in &epic.user_stories {
            let story_id = match epic_id {
                Some(epic_id) => self.create_user_story(epic_id, &story.name).await,
                None => None,
            };
            for definition in &story.test_cases {
                records.push(self.import_into(definition, story_id).await);
            }
        }
        records
    }

    /// Close the reporting session and log out. Call exactly once per `start`.
    pub async fn end(&mut self) -> Result<(), SyncError> {
        self.sessions.end(self.gateway.as_ref()).await
    }

    /// Results recorded since the last `start`
    pub fn summary(&self) -> PublishSummary {
        PublishSummary {
            session_name: self.session_name.clone(),
            records: self.records.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Run a complete publish: `start`, every item in order, then `end`.
    ///
    /// `end` runs even if publishes failed; its own failure is logged, not
    /// returned.
    pub async fn run<I>(&mut self, items: I) -> Result<PublishSummary, SyncError>
    where
        I: IntoIterator<Item = (TestCaseDefinition, Verdict)>,
    {
        self.start().await?;

        for (definition, verdict) in items {
            self.publish_automated_test(&definition, verdict).await;
        }

        if let Err(e) = self.end().await {
            log::error!("Ending the session failed: {}", e);
        }
        Ok(self.summary())
    }

    async fn import_into(
        &mut self,
        definition: &TestCaseDefinition,
        user_story_id: Option<i64>,
    ) -> PublishRecord {
        log::info!("Importing '{}' ({})", definition.name, definition.external_id);
        let record = PublishRecord::new(definition, None);
        let (record, _) = self.synchronize(definition, user_story_id, record).await;
        self.finish_record(record)
    }

    fn creates_requirements(&self) -> Option<&SessionContext> {
        if self.options.skip_test_case_updates {
            return None;
        }
        self.sessions.context()
    }

    async fn create_epic(&self, name: &str) -> Option<i64> {
        let context = self.creates_requirements()?;
        log::info!("Creating epic '{}'", name);
        match self
            .gateway
            .create_epic(&context.auth, name)
            .await
            .during("createEpic")
        {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("{}; importing its test cases without user stories", e);
                None
            }
        }
    }

    async fn create_user_story(&self, epic_id: i64, name: &str) -> Option<i64> {
        let context = self.creates_requirements()?;
        log::info!("Creating user story '{}'", name);
        match self
            .gateway
            .create_user_story(&context.auth, epic_id, name)
            .await
            .during("createUserStory")
        {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("{}; importing its test cases without a user story", e);
                None
            }
        }
    }

    async fn publish_steps(
        &self,
        definition: &TestCaseDefinition,
        verdict: Verdict,
        record: PublishRecord,
    ) -> PublishRecord {
        let (record, resolved) = self.synchronize(definition, None, record).await;
        let Some(resolved) = resolved else {
            return record;
        };
        let Some(context) = self.sessions.context() else {
            return record.failed(SyncError::NoActiveSession.to_string());
        };

        match self
            .reporter
            .report(self.gateway.as_ref(), context, &resolved, verdict)
            .await
        {
            Outcome::Ok(report) => {
                let mut record = record;
                record.execution_id = Some(report.execution_id);
                let failures = report.step_failures + resolved.step_failures;
                if failures > 0 {
                    record.message = Some(format!("{} step operation(s) failed", failures));
                } else if resolved.is_drifted() {
                    record.message =
                        Some("steps differ from remote; reported aggregate result only".to_string());
                }
                record
            }
            Outcome::Warn(w) => record.skipped(w.to_string()),
            Outcome::Fail(e) => record.failed(e.to_string()),
        }
    }

    async fn synchronize(
        &self,
        definition: &TestCaseDefinition,
        user_story_id: Option<i64>,
        record: PublishRecord,
    ) -> (PublishRecord, Option<ResolvedTestCase>) {
        let Some(context) = self.sessions.context() else {
            return (record.failed(SyncError::NoActiveSession.to_string()), None);
        };

        match self
            .synchronizer
            .resolve_in(self.gateway.as_ref(), &context.auth, definition, user_story_id)
            .await
        {
            Outcome::Ok(resolved) => {
                let mut record = record;
                record.test_case_id = Some(resolved.test_case_id);
                record.sync_action = Some(resolved.action);
                if resolved.step_failures > 0 {
                    record.message =
                        Some(format!("{} step operation(s) failed", resolved.step_failures));
                }
                (record, Some(resolved))
            }
            Outcome::Warn(w) => (record.skipped(w.to_string()), None),
            Outcome::Fail(e) => (record.failed(e.to_string()), None),
        }
    }

    async fn publish_automation_run(
        &self,
        definition: &TestCaseDefinition,
        verdict: Verdict,
        record: PublishRecord,
    ) -> PublishRecord {
        let Some(context) = self.sessions.context() else {
            return record.failed(SyncError::NoActiveSession.to_string());
        };
        if definition.external_id.trim().is_empty() {
            let warning = Warning::MissingExternalId {
                name: definition.name.clone(),
            };
            return record.skipped(warning.to_string());
        }

        match self
            .reporter
            .run_automation(self.gateway.as_ref(), &context.auth, definition, verdict)
            .await
        {
            Outcome::Ok(execution_id) => {
                let mut record = record;
                record.execution_id = Some(execution_id);
                record
            }
            Outcome::Warn(w) => record.skipped(w.to_string()),
            Outcome::Fail(e) => record.failed(e.to_string()),
        }
    }

    fn finish_record(&mut self, record: PublishRecord) -> PublishRecord {
        let message = record.message.as_deref().unwrap_or_default();
        match record.status {
            PublishStatus::Published => log::info!("Published '{}'", record.external_id),
            PublishStatus::Skipped => {
                log::warn!("Skipped '{}': {}", record.external_id, message)
            }
            PublishStatus::Failed => {
                log::error!("Publishing '{}' failed: {}", record.external_id, message)
            }
        }
        self.records.push(record.clone());
        record
    }
}
