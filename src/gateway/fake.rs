//! In-memory gateway used by the synchronization tests

use super::error::{GatewayError, GatewayResult};
use super::types::*;
use super::RemoteGateway;
use crate::model::{AuthSession, ExecutionStatus, RemoteStep, SessionStatus, StepResult, Verdict};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Authenticate,
    Deauthenticate,
    CreateSession(String),
    JoinSession(i64),
    PatchSession(i64, SessionStatus),
    Find(String),
    Fetch(i64),
    CreateEpic(String),
    CreateUserStory(i64, String),
    CreateTestCase(String),
    PatchTestCase(i64, TestCasePatch),
    DeleteStep(i64, i64),
    CreateStep(i64, String),
    PreconditionMarker(i64, bool),
    CreateExecution(i64),
    LinkExecution(i64, i64, i64),
    ExecutionStatus(i64, ExecutionStatus),
    StepResult(i64, i64, Verdict),
    ExecutionResult(i64, Verdict),
    CreateAutomationRun(String),
    TerminateAutomation(String, Verdict),
}

impl Call {
    /// Whether the call changes remote test case or step state
    pub fn mutates_test_cases(&self) -> bool {
        matches!(
            self,
            Call::CreateTestCase(_)
                | Call::PatchTestCase(..)
                | Call::DeleteStep(..)
                | Call::CreateStep(..)
                | Call::PreconditionMarker(..)
        )
    }
}

#[derive(Debug, Default)]
pub struct FakeTestCase {
    pub name: String,
    pub external_id: Option<String>,
    pub steps: Vec<RemoteStep>,
    pub other_blocks: Vec<StepBlock>,
    pub to_be_reviewed: Option<bool>,
    pub precondition_empty: bool,
    pub user_story_id: Option<i64>,
}

impl FakeTestCase {
    pub fn step_texts(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.text.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct FakeExecution {
    pub test_case_id: i64,
    pub session_id: Option<i64>,
    pub statuses: Vec<ExecutionStatus>,
    pub step_results: Vec<StepResult>,
    pub result: Option<Verdict>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    next_id: i64,
    pub calls: Vec<Call>,
    pub test_cases: BTreeMap<i64, FakeTestCase>,
    pub executions: BTreeMap<i64, FakeExecution>,
    pub epics: BTreeMap<i64, String>,
    /// User story id to (epic id, name)
    pub user_stories: BTreeMap<i64, (i64, String)>,
    pub session_status: Vec<SessionStatus>,
    pub logged_in: bool,
    /// Operations that fail with a 500
    pub failing: HashSet<&'static str>,
    /// Step texts whose creation fails
    pub failing_step_texts: HashSet<String>,
    /// Step ids whose result submission fails
    pub failing_step_results: HashSet<i64>,
    /// External ids with an automation run still open
    pub running_automation: HashSet<String>,
    /// Terminating a run does not clear the conflict
    pub sticky_conflict: bool,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, operation: &'static str) -> GatewayResult<()> {
        if self.failing.contains(operation) {
            return Err(GatewayError::UnexpectedStatus {
                status: 500,
                body: format!("{} failed", operation),
            });
        }
        Ok(())
    }

    fn not_found(what: &str, id: i64) -> GatewayError {
        GatewayError::UnexpectedStatus {
            status: 404,
            body: format!("{} {} not found", what, id),
        }
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Insert a test case with the given `Test` block steps and return its id
    pub fn seed_test_case(&self, external_id: &str, steps: &[&str]) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        let steps: Vec<RemoteStep> = steps
            .iter()
            .map(|text| RemoteStep {
                id: state.next_id(),
                text: text.to_string(),
            })
            .collect();
        state.test_cases.insert(
            id,
            FakeTestCase {
                name: external_id.to_string(),
                external_id: Some(external_id.to_string()),
                steps,
                ..Default::default()
            },
        );
        id
    }

    pub fn fail(&self, operation: &'static str) {
        self.state().failing.insert(operation);
    }

    pub fn test_case(&self, external_id: &str) -> Option<(i64, Vec<RemoteStep>)> {
        self.state()
            .test_cases
            .iter()
            .find(|(_, tc)| tc.external_id.as_deref() == Some(external_id))
            .map(|(id, tc)| (*id, tc.steps.clone()))
    }

    /// User story the test case with `external_id` was created in
    pub fn user_story_of(&self, external_id: &str) -> Option<i64> {
        self.state()
            .test_cases
            .values()
            .find(|tc| tc.external_id.as_deref() == Some(external_id))
            .and_then(|tc| tc.user_story_id)
    }
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    async fn authenticate(
        &self,
        _workspace: &str,
        _username: &str,
        password: &str,
    ) -> GatewayResult<LoginGrant> {
        let mut state = self.state();
        state.calls.push(Call::Authenticate);
        state.check("authenticate")?;
        if password.is_empty() {
            return Err(GatewayError::UnexpectedStatus {
                status: 401,
                body: "invalid credentials".to_string(),
            });
        }
        state.logged_in = true;
        Ok(LoginGrant {
            access_token: "token".to_string(),
            tenant_id: 1,
            user_id: 99,
        })
    }

    async fn deauthenticate(&self, _auth: &AuthSession) -> GatewayResult<()> {
        let mut state = self.state();
        state.calls.push(Call::Deauthenticate);
        state.check("deauthenticate")?;
        state.logged_in = false;
        Ok(())
    }

    async fn create_reporting_session(
        &self,
        _auth: &AuthSession,
        name: &str,
    ) -> GatewayResult<i64> {
        let mut state = self.state();
        state.calls.push(Call::CreateSession(name.to_string()));
        state.check("createReportingSession")?;
        Ok(state.next_id())
    }

    async fn join_reporting_session(
        &self,
        _auth: &AuthSession,
        session_id: i64,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state.calls.push(Call::JoinSession(session_id));
        state.check("joinReportingSession")
    }

    async fn patch_reporting_session(
        &self,
        _auth: &AuthSession,
        session_id: i64,
        status: SessionStatus,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state.calls.push(Call::PatchSession(session_id, status));
        state.check("patchReportingSession")?;
        state.session_status.push(status);
        Ok(())
    }

    async fn find_test_cases_by_external_id(
        &self,
        _auth: &AuthSession,
        external_id: &str,
    ) -> GatewayResult<Vec<i64>> {
        let mut state = self.state();
        state.calls.push(Call::Find(external_id.to_string()));
        state.check("findTestCaseByExternalId")?;
        Ok(state
            .test_cases
            .iter()
            .filter(|(_, tc)| tc.external_id.as_deref() == Some(external_id))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn fetch_test_case(
        &self,
        _auth: &AuthSession,
        test_case_id: i64,
    ) -> GatewayResult<RemoteTestCase> {
        let mut state = self.state();
        state.calls.push(Call::Fetch(test_case_id));
        state.check("fetchTestCase")?;
        let tc = state
            .test_cases
            .get(&test_case_id)
            .ok_or_else(|| FakeState::not_found("test case", test_case_id))?;

        let mut blocks = tc.other_blocks.clone();
        blocks.push(StepBlock {
            name: TEST_STEP_BLOCK.to_string(),
            steps: tc.steps.clone(),
        });
        Ok(RemoteTestCase {
            id: test_case_id,
            external_id: tc.external_id.clone(),
            blocks,
        })
    }

    async fn create_epic(&self, _auth: &AuthSession, name: &str) -> GatewayResult<i64> {
        let mut state = self.state();
        state.calls.push(Call::CreateEpic(name.to_string()));
        state.check("createEpic")?;
        let id = state.next_id();
        state.epics.insert(id, name.to_string());
        Ok(id)
    }

    async fn create_user_story(
        &self,
        _auth: &AuthSession,
        epic_id: i64,
        name: &str,
    ) -> GatewayResult<i64> {
        let mut state = self.state();
        state
            .calls
            .push(Call::CreateUserStory(epic_id, name.to_string()));
        state.check("createUserStory")?;
        if !state.epics.contains_key(&epic_id) {
            return Err(FakeState::not_found("epic", epic_id));
        }
        let id = state.next_id();
        state.user_stories.insert(id, (epic_id, name.to_string()));
        Ok(id)
    }

    async fn create_test_case(
        &self,
        _auth: &AuthSession,
        name: &str,
        _kind: TestCaseKind,
        user_story_id: Option<i64>,
    ) -> GatewayResult<i64> {
        let mut state = self.state();
        state.calls.push(Call::CreateTestCase(name.to_string()));
        state.check("createTestCase")?;
        if let Some(story) = user_story_id {
            if !state.user_stories.contains_key(&story) {
                return Err(FakeState::not_found("user story", story));
            }
        }
        let id = state.next_id();
        state.test_cases.insert(
            id,
            FakeTestCase {
                name: name.to_string(),
                user_story_id,
                ..Default::default()
            },
        );
        Ok(id)
    }

    async fn patch_test_case(
        &self,
        _auth: &AuthSession,
        test_case_id: i64,
        patch: &TestCasePatch,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::PatchTestCase(test_case_id, patch.clone()));
        state.check("patchTestCase")?;
        let tc = state
            .test_cases
            .get_mut(&test_case_id)
            .ok_or_else(|| FakeState::not_found("test case", test_case_id))?;
        if let Some(external_id) = &patch.external_id {
            tc.external_id = external_id.value.clone();
        }
        if let Some(review) = patch.to_be_reviewed {
            tc.to_be_reviewed = Some(review);
        }
        Ok(())
    }

    async fn delete_test_step(
        &self,
        _auth: &AuthSession,
        test_case_id: i64,
        step_id: i64,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state.calls.push(Call::DeleteStep(test_case_id, step_id));
        state.check("deleteTestStep")?;
        let tc = state
            .test_cases
            .get_mut(&test_case_id)
            .ok_or_else(|| FakeState::not_found("test case", test_case_id))?;
        tc.steps.retain(|s| s.id != step_id);
        Ok(())
    }

    async fn create_test_step(
        &self,
        _auth: &AuthSession,
        test_case_id: i64,
        text: &str,
    ) -> GatewayResult<i64> {
        let mut state = self.state();
        state
            .calls
            .push(Call::CreateStep(test_case_id, text.to_string()));
        state.check("createTestStep")?;
        if state.failing_step_texts.contains(text) {
            return Err(GatewayError::UnexpectedStatus {
                status: 500,
                body: format!("cannot create '{}'", text),
            });
        }
        let id = state.next_id();
        let tc = state
            .test_cases
            .get_mut(&test_case_id)
            .ok_or_else(|| FakeState::not_found("test case", test_case_id))?;
        tc.steps.push(RemoteStep {
            id,
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn set_precondition_empty_marker(
        &self,
        _auth: &AuthSession,
        test_case_id: i64,
        empty: bool,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::PreconditionMarker(test_case_id, empty));
        state.check("setPreconditionEmptyMarker")?;
        if let Some(tc) = state.test_cases.get_mut(&test_case_id) {
            tc.precondition_empty = empty;
        }
        Ok(())
    }

    async fn create_execution(&self, _auth: &AuthSession, test_case_id: i64) -> GatewayResult<i64> {
        let mut state = self.state();
        state.calls.push(Call::CreateExecution(test_case_id));
        state.check("createExecution")?;
        let id = state.next_id();
        state.executions.insert(
            id,
            FakeExecution {
                test_case_id,
                statuses: vec![ExecutionStatus::New],
                ..Default::default()
            },
        );
        Ok(id)
    }

    async fn link_execution_to_session(
        &self,
        _auth: &AuthSession,
        session_id: i64,
        test_case_id: i64,
        execution_id: i64,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::LinkExecution(session_id, test_case_id, execution_id));
        state.check("linkExecutionToSession")?;
        let execution = state
            .executions
            .get_mut(&execution_id)
            .ok_or_else(|| FakeState::not_found("execution", execution_id))?;
        execution.session_id = Some(session_id);
        Ok(())
    }

    async fn set_execution_status(
        &self,
        _auth: &AuthSession,
        _test_case_id: i64,
        execution_id: i64,
        status: ExecutionStatus,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::ExecutionStatus(execution_id, status));
        if status == ExecutionStatus::Finished {
            state.check("setExecutionStatus:Finished")?;
        }
        state.check("setExecutionStatus")?;
        let execution = state
            .executions
            .get_mut(&execution_id)
            .ok_or_else(|| FakeState::not_found("execution", execution_id))?;
        execution.statuses.push(status);
        Ok(())
    }

    async fn set_step_result(
        &self,
        _auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        step_id: i64,
        verdict: Verdict,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::StepResult(execution_id, step_id, verdict));
        state.check("setStepResult")?;
        if state.failing_step_results.contains(&step_id) {
            return Err(GatewayError::UnexpectedStatus {
                status: 500,
                body: format!("cannot set result of step {}", step_id),
            });
        }
        let step_exists = state
            .test_cases
            .get(&test_case_id)
            .map_or(false, |tc| tc.steps.iter().any(|s| s.id == step_id));
        if !step_exists {
            return Err(FakeState::not_found("step", step_id));
        }
        let execution = state
            .executions
            .get_mut(&execution_id)
            .ok_or_else(|| FakeState::not_found("execution", execution_id))?;
        execution.step_results.push(StepResult { step_id, verdict });
        Ok(())
    }

    async fn set_execution_result(
        &self,
        _auth: &AuthSession,
        _test_case_id: i64,
        execution_id: i64,
        verdict: Verdict,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::ExecutionResult(execution_id, verdict));
        state.check("setExecutionResult")?;
        let execution = state
            .executions
            .get_mut(&execution_id)
            .ok_or_else(|| FakeState::not_found("execution", execution_id))?;
        execution.result = Some(verdict);
        Ok(())
    }

    async fn create_automation_run(
        &self,
        _auth: &AuthSession,
        run: &AutomationRun,
    ) -> GatewayResult<i64> {
        let mut state = self.state();
        state
            .calls
            .push(Call::CreateAutomationRun(run.external_id.clone()));
        state.check("createAutomationRun")?;
        if state.running_automation.contains(&run.external_id) {
            return Err(GatewayError::Conflict {
                body: format!("automation for {} already running", run.external_id),
            });
        }
        Ok(state.next_id())
    }

    async fn terminate_running_automation(
        &self,
        _auth: &AuthSession,
        external_id: &str,
        verdict: Verdict,
    ) -> GatewayResult<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::TerminateAutomation(external_id.to_string(), verdict));
        state.check("terminateRunningAutomation")?;
        if !state.sticky_conflict {
            state.running_automation.remove(external_id);
        }
        Ok(())
    }
}
