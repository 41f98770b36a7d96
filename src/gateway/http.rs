//! HTTP client for the TestBench REST API
//!
//! Maps every [`RemoteGateway`] operation onto one REST call. A 2xx status other
//! than the primary one is accepted with a warning; 409 becomes
//! [`GatewayError::Conflict`]; any other status becomes
//! [`GatewayError::UnexpectedStatus`] carrying the response body.

use super::error::{GatewayError, GatewayResult};
use super::types::*;
use super::RemoteGateway;
use crate::model::{AuthSession, ExecutionStatus, SessionStatus, Verdict};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct HttpGateway {
    /// API root (e.g., "https://testbench.example.com/api")
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(server_url: &str, timeout_secs: u64, accept_invalid_certs: bool) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            base_url: format!("{}/api", server_url.trim_end_matches('/')),
            client,
        })
    }

    fn product_url(&self, auth: &AuthSession, suffix: &str) -> String {
        format!(
            "{}/tenants/{}/products/{}/{}",
            self.base_url, auth.tenant_id, auth.product_id, suffix
        )
    }

    fn session_url(&self, auth: &AuthSession, session_id: i64, suffix: &str) -> String {
        self.product_url(auth, &format!("planning/sessions/{}/{}", session_id, suffix))
    }

    fn test_case_url(&self, auth: &AuthSession, test_case_id: i64, suffix: &str) -> String {
        let path = format!("specifications/testCases/{}{}", test_case_id, suffix);
        self.product_url(auth, &path)
    }

    fn execution_url(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        suffix: &str,
    ) -> String {
        let path = format!(
            "executions/testCases/{}/executions/{}/{}",
            test_case_id, execution_id, suffix
        );
        self.product_url(auth, &path)
    }

    /// Stop URL of the automation run of `external_id`, the id encoded as one
    /// path segment
    fn automation_stop_url(&self, auth: &AuthSession, external_id: &str) -> GatewayResult<Url> {
        let base = self.product_url(auth, "automation/testCases");
        let mut url =
            Url::parse(&base).map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(base))?
            .push(external_id)
            .push("stop")
            .push("v1");
        Ok(url)
    }

    fn authed(&self, method: Method, url: &str, auth: &AuthSession) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&auth.access_token)
    }

    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> GatewayResult<Response> {
        let response = request.send().await.map_err(GatewayError::Transport)?;
        let status = response.status();

        if status == expected {
            return Ok(response);
        }
        if status.is_success() {
            log::warn!(
                "{} returned {} instead of {}, continuing",
                operation,
                status,
                expected
            );
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            return Err(GatewayError::Conflict { body });
        }
        Err(GatewayError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let body = response.text().await.map_err(GatewayError::Transport)?;
        log::debug!("response: {}", body);
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(format!("{} in {}", e, body)))
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn authenticate(
        &self,
        workspace: &str,
        username: &str,
        password: &str,
    ) -> GatewayResult<LoginGrant> {
        let url = format!("{}/tenants/login/session", self.base_url);
        let body = LoginRequest {
            tenant_name: workspace,
            force: true,
            login: username,
            password,
        };

        let response = self
            .send("authenticate", self.client.post(&url).json(&body), StatusCode::CREATED)
            .await?;
        let login: LoginResponse = Self::decode(response).await?;

        Ok(LoginGrant {
            access_token: login.session_token,
            tenant_id: login.tenant_id,
            user_id: login.user_id,
        })
    }

    async fn deauthenticate(&self, auth: &AuthSession) -> GatewayResult<()> {
        let url = format!("{}/tenants/{}/login/session", self.base_url, auth.tenant_id);
        self.send("deauthenticate", self.authed(Method::DELETE, &url, auth), StatusCode::OK)
            .await?;
        Ok(())
    }

    async fn create_reporting_session(
        &self,
        auth: &AuthSession,
        name: &str,
    ) -> GatewayResult<i64> {
        let url = self.product_url(auth, "planning/sessions/v1");
        let request = self
            .authed(Method::POST, &url, auth)
            .json(&serde_json::json!({ "name": name }));

        let response = self
            .send("createReportingSession", request, StatusCode::CREATED)
            .await?;
        let created: SessionCreatedResponse = Self::decode(response).await?;
        Ok(created.test_session_id)
    }

    async fn join_reporting_session(
        &self,
        auth: &AuthSession,
        session_id: i64,
    ) -> GatewayResult<()> {
        let url = self.session_url(auth, session_id, "participant/self/v1");
        let request = self
            .authed(Method::PATCH, &url, auth)
            .json(&serde_json::json!({ "active": true }));

        self.send("joinReportingSession", request, StatusCode::OK)
            .await?;
        Ok(())
    }

    async fn patch_reporting_session(
        &self,
        auth: &AuthSession,
        session_id: i64,
        status: SessionStatus,
    ) -> GatewayResult<()> {
        let url = self.session_url(auth, session_id, "v1");
        let request = self
            .authed(Method::PATCH, &url, auth)
            .json(&serde_json::json!({ "status": status }));

        self.send("patchReportingSession", request, StatusCode::OK)
            .await?;
        Ok(())
    }

    async fn find_test_cases_by_external_id(
        &self,
        auth: &AuthSession,
        external_id: &str,
    ) -> GatewayResult<Vec<i64>> {
        let url = self.product_url(auth, "elements");
        let filter = format!("externalId:equals:{}", external_id);
        let request = self
            .authed(Method::GET, &url, auth)
            .query(&[("fieldValue", filter.as_str()), ("types", "TestCase")]);

        let response = self
            .send("findTestCaseByExternalId", request, StatusCode::OK)
            .await?;
        let found: ElementsResponse = Self::decode(response).await?;

        Ok(found
            .elements
            .into_iter()
            .filter_map(|e| e.test_case_summary.map(|s| s.id))
            .collect())
    }

    async fn fetch_test_case(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
    ) -> GatewayResult<RemoteTestCase> {
        let url = self.test_case_url(auth, test_case_id, "");
        let response = self
            .send("fetchTestCase", self.authed(Method::GET, &url, auth), StatusCode::OK)
            .await?;
        let test_case: TestCaseResponse = Self::decode(response).await?;
        Ok(test_case.into_remote(test_case_id))
    }

    async fn create_epic(&self, auth: &AuthSession, name: &str) -> GatewayResult<i64> {
        let url = self.product_url(auth, "requirements/epics");
        let body = CreateEpicRequest { name };

        let response = self
            .send(
                "createEpic",
                self.authed(Method::POST, &url, auth).json(&body),
                StatusCode::CREATED,
            )
            .await?;
        let created: EpicCreatedResponse = Self::decode(response).await?;
        Ok(created.epic_id)
    }

    async fn create_user_story(
        &self,
        auth: &AuthSession,
        epic_id: i64,
        name: &str,
    ) -> GatewayResult<i64> {
        let url = self.product_url(auth, "requirements/userStories");
        let body = CreateUserStoryRequest { epic_id, name };

        let response = self
            .send(
                "createUserStory",
                self.authed(Method::POST, &url, auth).json(&body),
                StatusCode::CREATED,
            )
            .await?;
        let created: UserStoryCreatedResponse = Self::decode(response).await?;
        Ok(created.user_story_id)
    }

    async fn create_test_case(
        &self,
        auth: &AuthSession,
        name: &str,
        kind: TestCaseKind,
        user_story_id: Option<i64>,
    ) -> GatewayResult<i64> {
        let url = self.product_url(auth, "specifications/testCases");
        let body = CreateTestCaseRequest {
            name,
            test_case_type: kind,
            user_story_id,
        };

        let response = self
            .send(
                "createTestCase",
                self.authed(Method::POST, &url, auth).json(&body),
                StatusCode::CREATED,
            )
            .await?;
        let created: TestCaseCreatedResponse = Self::decode(response).await?;
        Ok(created.test_case_id)
    }

    async fn patch_test_case(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        patch: &TestCasePatch,
    ) -> GatewayResult<()> {
        let url = self.test_case_url(auth, test_case_id, "");
        self.send(
            "patchTestCase",
            self.authed(Method::PATCH, &url, auth).json(patch),
            StatusCode::OK,
        )
        .await?;
        Ok(())
    }

    async fn delete_test_step(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        step_id: i64,
    ) -> GatewayResult<()> {
        let url = self.test_case_url(auth, test_case_id, &format!("/testSteps/{}", step_id));
        self.send("deleteTestStep", self.authed(Method::DELETE, &url, auth), StatusCode::OK)
            .await?;
        Ok(())
    }

    async fn create_test_step(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        text: &str,
    ) -> GatewayResult<i64> {
        let url = self.test_case_url(auth, test_case_id, "/testSteps");
        let body = CreateTestStepRequest {
            test_step_block: TEST_STEP_BLOCK,
            description: text,
        };

        let response = self
            .send(
                "createTestStep",
                self.authed(Method::POST, &url, auth).json(&body),
                StatusCode::CREATED,
            )
            .await?;
        let created: TestStepCreatedResponse = Self::decode(response).await?;
        Ok(created.test_step_id)
    }

    async fn set_precondition_empty_marker(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        empty: bool,
    ) -> GatewayResult<()> {
        let url = self.test_case_url(auth, test_case_id, "/preconditions/emptyMarker");
        self.send(
            "setPreconditionEmptyMarker",
            self.authed(Method::PUT, &url, auth).json(&empty),
            StatusCode::OK,
        )
        .await?;
        Ok(())
    }

    async fn create_execution(&self, auth: &AuthSession, test_case_id: i64) -> GatewayResult<i64> {
        let url = self.product_url(auth, &format!("executions/testCases/{}", test_case_id));
        let response = self
            .send(
                "createExecution",
                self.authed(Method::POST, &url, auth),
                StatusCode::CREATED,
            )
            .await?;
        let created: ExecutionCreatedResponse = Self::decode(response).await?;
        Ok(created.execution_id)
    }

    async fn link_execution_to_session(
        &self,
        auth: &AuthSession,
        session_id: i64,
        test_case_id: i64,
        execution_id: i64,
    ) -> GatewayResult<()> {
        let url = self.session_url(auth, session_id, "assign/executions/v1");
        let body = AssignExecutionsRequest {
            add_executions: vec![AssignedExecution {
                test_case_ids: TestCaseIdRef { test_case_id },
                execution_id,
            }],
        };

        self.send(
            "linkExecutionToSession",
            self.authed(Method::PATCH, &url, auth).json(&body),
            StatusCode::OK,
        )
        .await?;
        Ok(())
    }

    async fn set_execution_status(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        status: ExecutionStatus,
    ) -> GatewayResult<()> {
        let url = self.execution_url(auth, test_case_id, execution_id, "status");
        self.send(
            "setExecutionStatus",
            self.authed(Method::PUT, &url, auth).json(&status),
            StatusCode::OK,
        )
        .await?;
        Ok(())
    }

    async fn set_step_result(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        step_id: i64,
        verdict: Verdict,
    ) -> GatewayResult<()> {
        let suffix = format!("testSteps/{}/result", step_id);
        let url = self.execution_url(auth, test_case_id, execution_id, &suffix);
        self.send(
            "setStepResult",
            self.authed(Method::PUT, &url, auth).json(&verdict),
            StatusCode::OK,
        )
        .await?;
        Ok(())
    }

    async fn set_execution_result(
        &self,
        auth: &AuthSession,
        test_case_id: i64,
        execution_id: i64,
        verdict: Verdict,
    ) -> GatewayResult<()> {
        let url = self.execution_url(auth, test_case_id, execution_id, "result");
        self.send(
            "setExecutionResult",
            self.authed(Method::PUT, &url, auth).json(&verdict),
            StatusCode::OK,
        )
        .await?;
        Ok(())
    }

    async fn create_automation_run(
        &self,
        auth: &AuthSession,
        run: &AutomationRun,
    ) -> GatewayResult<i64> {
        let url = self.product_url(auth, "automation/testCases/v1");
        let response = self
            .send(
                "createAutomationRun",
                self.authed(Method::POST, &url, auth).json(run),
                StatusCode::CREATED,
            )
            .await?;
        let created: ExecutionCreatedResponse = Self::decode(response).await?;
        Ok(created.execution_id)
    }

    async fn terminate_running_automation(
        &self,
        auth: &AuthSession,
        external_id: &str,
        verdict: Verdict,
    ) -> GatewayResult<()> {
        let url = self.automation_stop_url(auth, external_id)?;
        let request = self
            .authed(Method::PATCH, url.as_str(), auth)
            .json(&serde_json::json!({ "result": verdict }));

        self.send("terminateRunningAutomation", request, StatusCode::OK)
            .await?;
        Ok(())
    }
}
