use thiserror::Error;

/// Failure of a remote read (identity, password status, setup status).
///
/// Variants keep transient transport problems apart from definite server
/// answers so logs can tell them apart. Access policy treats every variant
/// the same way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl CheckError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CheckError::Transport(_) | CheckError::Timeout => true,
            CheckError::Status(code) => *code >= 500,
            CheckError::Unauthorized(_) | CheckError::Decode(_) => false,
        }
    }
}

/// Failure to resolve the signed-in user's identity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("no session")]
    NoSession,

    #[error("identity fetch failed: {0}")]
    Fetch(#[from] CheckError),
}
