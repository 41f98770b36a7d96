use super::error::{GatewayResultExt, SyncError, Warning};
use super::outcome::{BatchOutcome, Outcome};
use super::session::SessionContext;
use super::synchronizer::ResolvedTestCase;
use crate::gateway::{AutomationRun, RemoteGateway, TestCasePatch};
use crate::model::{AuthSession, ExecutionStatus, RemoteStep, StepResult, TestCaseDefinition, Verdict};
use crate::utils::config::Options;

/// Retries after terminating a conflicting automation run
pub const MAX_AUTOMATION_RETRIES: u32 = 1;

/// What was recorded for one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub execution_id: i64,
    /// Step results accepted by the remote service
    pub step_results: Vec<StepResult>,
    pub step_failures: usize,
    /// Only the aggregate result was reported: the steps had drifted, or the
    /// test case has no remote steps to carry the verdict
    pub aggregate_only: bool,
}

/// One result per step, all `Passed`, except the last one when the test failed.
///
/// The failure is attributed to the last observed step; there is no root-cause
/// attribution.
pub fn assign_step_verdicts(steps: &[RemoteStep], verdict: Verdict) -> Vec<StepResult> {
    let mut results: Vec<StepResult> = steps
        .iter()
        .map(|s| StepResult {
            step_id: s.id,
            verdict: Verdict::Passed,
        })
        .collect();

    if verdict == Verdict::Failed {
        if let Some(last) = results.last_mut() {
            last.verdict = Verdict::Failed;
        }
    }
    results
}

pub struct ExecutionReporter {
    close_already_running_automation: bool,
    skip_test_case_updates: bool,
}

impl ExecutionReporter {
    pub fn new(options: &Options) -> Self {
        Self {
            close_already_running_automation: options.close_already_running_automation,
            skip_test_case_updates: options.skip_test_case_updates,
        }
    }

    /// Create an execution for `resolved`, report its results and finish it.
    ///
    /// If this fails after the execution went `InProgress`, the execution stays
    /// `InProgress` remotely.
    pub async fn report(
        &self,
        gateway: &dyn RemoteGateway,
        context: &SessionContext,
        resolved: &ResolvedTestCase,
        verdict: Verdict,
    ) -> Outcome<ExecutionReport> {
        match self.try_report(gateway, context, resolved, verdict).await {
            Ok(report) => Outcome::Ok(report),
            Err(e) => Outcome::Fail(e),
        }
    }

    async fn try_report(
        &self,
        gateway: &dyn RemoteGateway,
        context: &SessionContext,
        resolved: &ResolvedTestCase,
        verdict: Verdict,
    ) -> Result<ExecutionReport, SyncError> {
        let auth = &context.auth;
        let test_case_id = resolved.test_case_id;

        let execution_id = gateway
            .create_execution(auth, test_case_id)
            .await
            .during("createExecution")?;
        log::info!(
            "Created execution {} for test case {}",
            execution_id,
            test_case_id
        );

        if let Err(e) = gateway
            .link_execution_to_session(auth, context.reporting.id, test_case_id, execution_id)
            .await
        {
            log::warn!(
                "Adding execution {} to reporting session {} failed: {}",
                execution_id,
                context.reporting.id,
                e
            );
        }

        gateway
            .set_execution_status(auth, test_case_id, execution_id, ExecutionStatus::InProgress)
            .await
            .during("setExecutionStatus")?;

        let report = if resolved.is_drifted() {
            flag_for_review(gateway, auth, test_case_id).await;
            report_aggregate(gateway, auth, test_case_id, execution_id, verdict).await?
        } else if resolved.steps.is_empty() {
            report_aggregate(gateway, auth, test_case_id, execution_id, verdict).await?
        } else {
            self.report_steps(gateway, auth, resolved, execution_id, verdict)
                .await
        };

        gateway
            .set_execution_status(auth, test_case_id, execution_id, ExecutionStatus::Finished)
            .await
            .during("setExecutionStatus")?;
        log::info!(
            "Execution {} of test case {} finished: {}",
            execution_id,
            test_case_id,
            verdict
        );

        Ok(report)
    }

    async fn report_steps(
        &self,
        gateway: &dyn RemoteGateway,
        auth: &AuthSession,
        resolved: &ResolvedTestCase,
        execution_id: i64,
        verdict: Verdict,
    ) -> ExecutionReport {
        let mut submitted = BatchOutcome::default();
        for result in assign_step_verdicts(&resolved.steps, verdict) {
            let sent = gateway
                .set_step_result(
                    auth,
                    resolved.test_case_id,
                    execution_id,
                    result.step_id,
                    result.verdict,
                )
                .await
                .during("setStepResult")
                .map(|_| result);
            submitted.push(format!("step {}", result.step_id), sent);
        }
        submitted.log_failures(&format!("Reporting step results of execution {}", execution_id));

        ExecutionReport {
            execution_id,
            step_failures: submitted.failed.len(),
            step_results: submitted.succeeded,
            aggregate_only: false,
        }
    }

    /// Submit a definition and its verdict as a single automation run.
    ///
    /// On a conflict the stale run is terminated with `Calculated` and the
    /// submission retried, at most [`MAX_AUTOMATION_RETRIES`] times, when
    /// `close_already_running_automation` is set.
    pub async fn run_automation(
        &self,
        gateway: &dyn RemoteGateway,
        auth: &AuthSession,
        definition: &TestCaseDefinition,
        verdict: Verdict,
    ) -> Outcome<i64> {
        let run = AutomationRun {
            external_id: definition.external_id.trim().to_string(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            test_steps: definition.test_steps.clone(),
            result: verdict,
            skip_test_case_updates: self.skip_test_case_updates,
        };

        let mut retries = 0;
        loop {
            let error = match gateway.create_automation_run(auth, &run).await {
                Ok(execution_id) => {
                    log::info!(
                        "Automation run {} recorded for '{}'",
                        execution_id,
                        run.external_id
                    );
                    return Outcome::Ok(execution_id);
                }
                Err(e) => e,
            };

            if !error.is_conflict() {
                return Outcome::Fail(SyncError::gateway("createAutomationRun", error));
            }
            if !self.close_already_running_automation {
                log::warn!(
                    "Automation for '{}' is already running; result not imported",
                    run.external_id
                );
                return Outcome::Warn(Warning::AutomationConflict {
                    external_id: run.external_id,
                });
            }
            if retries >= MAX_AUTOMATION_RETRIES {
                return Outcome::Fail(SyncError::gateway("createAutomationRun", error));
            }
            retries += 1;

            log::warn!(
                "Closing running automation for '{}' and retrying",
                run.external_id
            );
            if let Err(e) = gateway
                .terminate_running_automation(auth, &run.external_id, Verdict::Calculated)
                .await
            {
                return Outcome::Fail(SyncError::gateway("terminateRunningAutomation", e));
            }
        }
    }
}

/// Remote steps are stale; the test case needs a human look
async fn flag_for_review(gateway: &dyn RemoteGateway, auth: &AuthSession, test_case_id: i64) {
    if let Err(e) = gateway
        .patch_test_case(auth, test_case_id, &TestCasePatch::review_only())
        .await
    {
        log::warn!(
            "Flagging test case {} for review failed: {}",
            test_case_id,
            e
        );
    }
}

/// Report the verdict on the execution itself, without step results
async fn report_aggregate(
    gateway: &dyn RemoteGateway,
    auth: &AuthSession,
    test_case_id: i64,
    execution_id: i64,
    verdict: Verdict,
) -> Result<ExecutionReport, SyncError> {
    gateway
        .set_execution_result(auth, test_case_id, execution_id, verdict)
        .await
        .during("setExecutionResult")?;

    Ok(ExecutionReport {
        execution_id,
        step_results: Vec::new(),
        step_failures: 0,
        aggregate_only: true,
    })
}
