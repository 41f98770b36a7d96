pub mod error;
pub mod http;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{GatewayError, GatewayResult};
pub use http::HttpGateway;
pub use types::*;

use crate::model::{AuthSession, ExecutionStatus, SessionStatus, Verdict};
use async_trait::async_trait;

/// Typed operations against the remote test-management service
///
/// Implementations are pure request/response: no retries, no decisions.
/// Every authenticated call takes the current [`AuthSession`] explicitly so that
/// callers never depend on hidden session state inside the gateway.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Log in to a workspace
    async fn authenticate(
        &self,
        workspace: &str,
        username: &str,
        password: &str,
    ) -> GatewayResult<LoginGrant>;

    /// Terminate the login session
    async fn deauthenticate(&self, auth: &AuthSession) -> GatewayResult<()>;

    /// Create a reporting session and return its id
    async fn create_reporting_session(&self, auth: &AuthSession, name: &str)
        -> GatewayResult<i64>;

    /// Join a reporting session as an active participant
    async fn join_reporting_session(&self, auth: &AuthSession, session_id: i64)
        -> GatewayResult<()>;

    async fn patch_reporting_session(
        &self,
        auth: &AuthSession,
        session_id: i64,
        status: SessionStatus,
    ) -> GatewayResult<()>;

    /// Ids of every test case whose external id equals `external_id`
    async fn find_test_cases_by_external_id(
        &self,
        auth: &AuthSession,
        external_id: &str,
    ) -> GatewayResult<Vec<i64>>;

    async fn fetch_test_case(&self, auth: &AuthSession, test_case_id: i64)
        -> GatewayResult<RemoteTestCase>;

    /// Create an epic requirement and return its id
    async fn create_epic(&self, auth: &AuthSession, name: &str) -> GatewayResult<i64>;

    /// Create a user story below `epic_id` and return its id
    async fn create_user_story(
        &self,
        auth: &AuthSession,
        epic_id: i64,
        name: &str,
    ) -> GatewayResult<i64>;

    /// Create a test case, linked to `user_story_id` when given
    async fn create_test_case(
        &self,
        auth: &AuthSession,
        name: &str,
        kind: TestCaseKind,
        user_story_id: Option<i64>,
    ) -> GatewayResult<i64>;

    async fn patch_test_case(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        patch: &TestCasePatch,
    ) -> GatewayResult<()>;

    async fn delete_test_step(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        step_id: i64,
    ) -> GatewayResult<()>;

    /// Append a step to the `Test` block and return its id
    async fn create_test_step(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        text: &str,
    ) -> GatewayResult<i64>;

    async fn set_precondition_empty_marker(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        empty: bool,
    ) -> GatewayResult<()>;

    async fn create_execution(&self, auth: &AuthSession, test_case_id: i64) -> GatewayResult<i64>;

    async fn link_execution_to_session(
        &self,
        auth: &AuthSession,
        session_id: i64,
        test_case_id: i64,
        execution_id: i64,
    ) -> GatewayResult<()>;

    async fn set_execution_status(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        status: ExecutionStatus,
    ) -> GatewayResult<()>;

    async fn set_step_result(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        step_id: i64,
        verdict: Verdict,
    ) -> GatewayResult<()>;

    async fn set_execution_result(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        verdict: Verdict,
    ) -> GatewayResult<()>;

    /// Submit a whole test case and its result as one automation run.
    ///
    /// Fails with [`GatewayError::Conflict`] while another run for the same
    /// external id is still open.
    async fn create_automation_run(&self, auth: &AuthSession, run: &AutomationRun)
        -> GatewayResult<i64>;

    /// Close the automation run currently open for `external_id`
    async fn terminate_running_automation(
        &self,
        auth: &AuthSession,
        external_id: &str,
        verdict: Verdict,
    ) -> GatewayResult<()>;
}
