use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
