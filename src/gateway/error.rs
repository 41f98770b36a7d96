use thiserror::Error;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Classified failure of a single remote call
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Another automation instance already holds the resource
    #[error("conflict: {body}")]
    Conflict { body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, GatewayError::Conflict { .. })
    }
}
