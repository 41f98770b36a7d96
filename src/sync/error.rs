use crate::gateway::GatewayError;
use thiserror::Error;

/// Failure of a synchronization step
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{operation} failed: {source}")]
    Gateway {
        operation: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("a session is already active; call end() before starting another run")]
    SessionAlreadyActive,

    #[error("no active session; call start() first")]
    NoActiveSession,
}

impl SyncError {
    pub fn gateway(operation: &'static str, source: GatewayError) -> Self {
        SyncError::Gateway { operation, source }
    }
}

/// Reason a publish was deliberately skipped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("external id '{external_id}' matches {matches} test cases; refusing to guess")]
    AmbiguousExternalId { external_id: String, matches: usize },

    #[error("test case '{external_id}' does not exist and test case updates are disabled")]
    TestCaseMissing { external_id: String },

    #[error("test case '{name}' has no external id")]
    MissingExternalId { name: String },

    #[error("an automation run for '{external_id}' is already in progress")]
    AutomationConflict { external_id: String },
}

/// Attach the operation name to a gateway result
pub(crate) trait GatewayResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T, SyncError>;
}

impl<T> GatewayResultExt<T> for Result<T, GatewayError> {
    fn during(self, operation: &'static str) -> Result<T, SyncError> {
        self.map_err(|e| SyncError::gateway(operation, e))
    }
}
