use super::error::{GatewayResultExt, SyncError};
use crate::gateway::RemoteGateway;
use crate::model::{AuthSession, ReportingSession, SessionStatus};
use crate::utils::config::Options;
use chrono::{DateTime, SecondsFormat, Utc};

/// Authenticated session plus the reporting session of the current run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub auth: AuthSession,
    pub reporting: ReportingSession,
}

/// Owns the single auth/reporting session pair of a run
#[derive(Debug, Default)]
pub struct SessionLifecycleManager {
    context: Option<SessionContext>,
}

/// Reporting session name: `<prefix>_<ISO-8601 timestamp>`
pub fn session_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", prefix, now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl SessionLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.context.is_some()
    }

    /// Log in, then create, join and open the reporting session.
    ///
    /// Login and session creation failures propagate. Joining and opening the
    /// session are side effects the run can live without, so their failures are
    /// only logged.
    pub async fn start(
        &mut self,
        gateway: &dyn RemoteGateway,
        options: &Options,
    ) -> Result<&SessionContext, SyncError> {
        if self.context.is_some() {
            return Err(SyncError::SessionAlreadyActive);
        }

        log::info!(
            "Logging in to workspace '{}' as '{}'",
            options.workspace,
            options.username
        );
        let grant = gateway
            .authenticate(&options.workspace, &options.username, &options.password)
            .await
            .during("authenticate")?;

        let auth = AuthSession {
            access_token: grant.access_token,
            tenant_id: grant.tenant_id,
            product_id: options.product_id,
            user_id: grant.user_id,
        };

        let name = session_name(&options.session_prefix, Utc::now());
        log::info!("Creating reporting session '{}'", name);
        let session_id = match gateway
            .create_reporting_session(&auth, &name)
            .await
            .during("createReportingSession")
        {
            Ok(id) => id,
            Err(e) => {
                if let Err(logout) = gateway.deauthenticate(&auth).await {
                    log::error!("Logout after failed session creation failed: {}", logout);
                }
                return Err(e);
            }
        };

        if let Err(e) = gateway.join_reporting_session(&auth, session_id).await {
            log::warn!("Joining reporting session {} failed: {}", session_id, e);
        }
        if let Err(e) = gateway
            .patch_reporting_session(&auth, session_id, SessionStatus::InProgress)
            .await
        {
            log::warn!(
                "Setting reporting session {} to InProgress failed: {}",
                session_id,
                e
            );
        }

        let context = SessionContext {
            auth,
            reporting: ReportingSession {
                id: session_id,
                name,
            },
        };
        let context = self.context.insert(context);
        Ok(&*context)
    }

    /// Complete the reporting session and log out.
    ///
    /// Both calls are always attempted; the first error is returned. The held
    /// context is dropped either way.
    pub async fn end(&mut self, gateway: &dyn RemoteGateway) -> Result<(), SyncError> {
        let context = self.context.take().ok_or(SyncError::NoActiveSession)?;
        let session_id = context.reporting.id;

        log::info!("Completing reporting session '{}'", context.reporting.name);
        let completed = gateway
            .patch_reporting_session(&context.auth, session_id, SessionStatus::Completed)
            .await
            .during("patchReportingSession");
        if let Err(e) = &completed {
            log::error!("{}", e);
        }

        log::info!("Logging out");
        let logged_out = gateway
            .deauthenticate(&context.auth)
            .await
            .during("deauthenticate");
        if let Err(e) = &logged_out {
            log::error!("{}", e);
        }

        completed.and(logged_out)
    }
}
