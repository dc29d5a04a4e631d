use thiserror::Error;

/// Why a status update did not reach the server
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The server answered with a non-success status code
    #[error("server rejected status update: HTTP {status}")]
    Rejected { status: u16, body: String },

    /// DNS, connect, timeout or malformed response
    #[error("transport failure: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// HTTP status code, when the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeliveryError::Rejected { status, .. } => Some(*status),
            DeliveryError::Transport(_) => None,
        }
    }
}

/// Outcome of a single delivery attempt
pub type DeliveryResult = Result<(), DeliveryError>;

/// Failures while exchanging an authorization code for a token
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token exchange rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("token exchange transport failure: {0}")]
    Transport(String),

    #[error("malformed token response: {0}")]
    InvalidResponse(String),

    #[error("authorization denied by provider: {0}")]
    Denied(String),

    #[error("timed out waiting for the authorization callback")]
    Timeout,

    #[error("callback listener failed: {0}")]
    Callback(String),
}
