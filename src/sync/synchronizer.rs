//! Test case synchronization
//!
//! Resolves a local [`TestCaseDefinition`] to a remote test case id by its
//! external id, creating the test case or rewriting its `Test` step block when the
//! local steps have drifted from the remote ones.

use super::error::{GatewayResultExt, SyncError, Warning};
use super::outcome::{BatchOutcome, Outcome};
use crate::gateway::{
    DescriptionField, ExternalIdField, RemoteGateway, TestCaseKind, TestCasePatch,
};
use crate::model::{AuthSession, RemoteStep, TestCaseDefinition};
use crate::utils::config::Options;
use serde::Serialize;

/// What `resolve` did to the remote test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncAction {
    /// Test case did not exist and was created
    Created,
    /// Steps had drifted and were rewritten
    Updated,
    /// Remote steps already matched
    Unchanged,
    /// Steps had drifted but updates were not allowed; remote left untouched
    Drifted,
}

/// Remote identity of a local definition, ready for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTestCase {
    pub test_case_id: i64,
    /// Remote steps that currently exist, in order
    pub steps: Vec<RemoteStep>,
    pub action: SyncAction,
    /// Step deletions or creations that failed during reconciliation
    pub step_failures: usize,
}

impl ResolvedTestCase {
    pub fn is_drifted(&self) -> bool {
        self.action == SyncAction::Drifted
    }
}

/// True when the local step texts differ from the remote steps in count or in
/// any position. Comparison is ordinal and case-sensitive.
pub fn has_changed(local: &[String], remote: &[RemoteStep]) -> bool {
    local.len() != remote.len() || local.iter().zip(remote).any(|(l, r)| *l != r.text)
}

pub struct TestCaseSynchronizer {
    skip_test_case_updates: bool,
}

impl TestCaseSynchronizer {
    pub fn new(options: &Options) -> Self {
        Self {
            skip_test_case_updates: options.skip_test_case_updates,
        }
    }

    /// Whether the steps of an existing test case may be rewritten
    pub fn updates_allowed(&self, definition: &TestCaseDefinition) -> bool {
        definition
            .overwrite
            .unwrap_or(!self.skip_test_case_updates)
    }

    pub async fn resolve(
        &self,
        gateway: &dyn RemoteGateway,
        auth: &AuthSession,
        definition: &TestCaseDefinition,
    ) -> Outcome<ResolvedTestCase> {
        self.resolve_in(gateway, auth, definition, None).await
    }

    /// Like [`resolve`](Self::resolve), creating a missing test case inside
    /// `user_story_id`. An existing test case is never moved.
    pub async fn resolve_in(
        &self,
        gateway: &dyn RemoteGateway,
        auth: &AuthSession,
        definition: &TestCaseDefinition,
        user_story_id: Option<i64>,
    ) -> Outcome<ResolvedTestCase> {
        Outcome::flatten(
            self.try_resolve(gateway, auth, definition, user_story_id)
                .await,
        )
    }

    async fn try_resolve(
        &self,
        gateway: &dyn RemoteGateway,
        auth: &AuthSession,
        definition: &TestCaseDefinition,
        user_story_id: Option<i64>,
    ) -> Result<Outcome<ResolvedTestCase>, SyncError> {
        let external_id = definition.external_id.trim();
        if external_id.is_empty() {
            return Ok(Outcome::Warn(Warning::MissingExternalId {
                name: definition.name.clone(),
            }));
        }

        log::info!("Looking up test case '{}'", external_id);
        let matches = gateway
            .find_test_cases_by_external_id(auth, external_id)
            .await
            .during("findTestCaseByExternalId")?;

        match matches.as_slice() {
            [] if self.skip_test_case_updates => Ok(Outcome::Warn(Warning::TestCaseMissing {
                external_id: external_id.to_string(),
            })),
            [] => self
                .create(gateway, auth, definition, user_story_id)
                .await
                .map(Outcome::Ok),
            [test_case_id] => self
                .reconcile(gateway, auth, definition, *test_case_id)
                .await
                .map(Outcome::Ok),
            _ => Ok(Outcome::Warn(Warning::AmbiguousExternalId {
                external_id: external_id.to_string(),
                matches: matches.len(),
            })),
        }
    }

    async fn create(
        &self,
        gateway: &dyn RemoteGateway,
        auth: &AuthSession,
        definition: &TestCaseDefinition,
        user_story_id: Option<i64>,
    ) -> Result<ResolvedTestCase, SyncError> {
        log::info!("Creating test case '{}'", definition.name);
        let test_case_id = gateway
            .create_test_case(
                auth,
                &definition.name,
                TestCaseKind::StructuredTestCase,
                user_story_id,
            )
            .await
            .during("createTestCase")?;

        let patch = TestCasePatch {
            to_be_reviewed: Some(definition.mark_for_review),
            external_id: Some(ExternalIdField {
                value: Some(definition.external_id.trim().to_string()),
            }),
            ..automation_patch(definition, auth)
        };
        gateway
            .patch_test_case(auth, test_case_id, &patch)
            .await
            .during("patchTestCase")?;

        if let Err(e) = gateway
            .set_precondition_empty_marker(auth, test_case_id, true)
            .await
        {
            log::warn!(
                "Marking preconditions of test case {} as empty failed: {}",
                test_case_id,
                e
            );
        }

        let created = create_steps(gateway, auth, test_case_id, &definition.test_steps).await;
        created.log_failures(&format!("Creating steps of test case {}", test_case_id));

        Ok(ResolvedTestCase {
            test_case_id,
            step_failures: created.failed.len(),
            steps: created.succeeded,
            action: SyncAction::Created,
        })
    }

    async fn reconcile(
        &self,
        gateway: &dyn RemoteGateway,
        auth: &AuthSession,
        definition: &TestCaseDefinition,
        test_case_id: i64,
    ) -> Result<ResolvedTestCase, SyncError> {
        let remote = gateway
            .fetch_test_case(auth, test_case_id)
            .await
            .during("fetchTestCase")?;
        let remote_steps = remote.test_steps();

        if !has_changed(&definition.test_steps, &remote_steps) {
            log::info!("Test case {} is up to date", test_case_id);
            return Ok(ResolvedTestCase {
                test_case_id,
                steps: remote_steps,
                action: SyncAction::Unchanged,
                step_failures: 0,
            });
        }

        if !self.updates_allowed(definition) {
            log::warn!(
                "Steps of test case {} ('{}') differ from the local definition; updates are disabled",
                test_case_id,
                definition.external_id
            );
            return Ok(ResolvedTestCase {
                test_case_id,
                steps: remote_steps,
                action: SyncAction::Drifted,
                step_failures: 0,
            });
        }

        log::info!(
            "Rewriting steps of test case {} ({} remote, {} local)",
            test_case_id,
            remote_steps.len(),
            definition.test_steps.len()
        );

        let mut deleted = BatchOutcome::default();
        for step in &remote_steps {
            let result = gateway
                .delete_test_step(auth, test_case_id, step.id)
                .await
                .during("deleteTestStep");
            deleted.push(format!("step {} '{}'", step.id, step.text), result);
        }
        deleted.log_failures(&format!("Deleting steps of test case {}", test_case_id));

        let created = create_steps(gateway, auth, test_case_id, &definition.test_steps).await;
        created.log_failures(&format!("Creating steps of test case {}", test_case_id));

        let patch = TestCasePatch {
            to_be_reviewed: Some(true),
            ..automation_patch(definition, auth)
        };
        if let Err(e) = gateway.patch_test_case(auth, test_case_id, &patch).await {
            log::error!("Updating test case {} failed: {}", test_case_id, e);
        }

        Ok(ResolvedTestCase {
            test_case_id,
            step_failures: deleted.failed.len() + created.failed.len(),
            steps: created.succeeded,
            action: SyncAction::Updated,
        })
    }
}

/// Description, ownership and automation flag shared by create and update
fn automation_patch(definition: &TestCaseDefinition, auth: &AuthSession) -> TestCasePatch {
    TestCasePatch {
        description: Some(DescriptionField {
            text: definition.description.clone(),
        }),
        responsibles: Some(vec![auth.user_id]),
        is_automated: Some(true),
        ..Default::default()
    }
}

/// Create steps strictly in local order; a failed step is skipped, not retried
async fn create_steps(
    gateway: &dyn RemoteGateway,
    auth: &AuthSession,
    test_case_id: i64,
    texts: &[String],
) -> BatchOutcome<RemoteStep> {
    let mut created = BatchOutcome::default();
    for text in texts {
        let result = gateway
            .create_test_step(auth, test_case_id, text)
            .await
            .during("createTestStep")
            .map(|id| RemoteStep {
                id,
                text: text.clone(),
            });
        created.push(format!("step '{}'", text), result);
    }
    created
}
