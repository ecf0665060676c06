use thiserror::Error;

use crate::policy::{FailurePolicy, OnFailure, StatusCheck};

pub const ENV_PASSWORD_ON_FAILURE: &str = "WAYPOINT_PASSWORD_CHECK_ON_FAILURE";
pub const ENV_SETUP_ON_FAILURE: &str = "WAYPOINT_SETUP_CHECK_ON_FAILURE";
pub const ENV_MAX_REDIRECT_HOPS: &str = "WAYPOINT_MAX_REDIRECT_HOPS";

const MAX_HOPS_LIMIT: u32 = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Guard configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// What a failed status check means for the decision.
    pub failure_policy: FailurePolicy,
    /// Redirects followed within one navigation before falling back.
    pub max_redirect_hops: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_redirect_hops: 3,
        }
    }
}

impl GuardConfig {
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_max_redirect_hops(mut self, hops: u32) -> Self {
        self.max_redirect_hops = hops;
        self
    }

    /// Read overrides from `WAYPOINT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        for (key, check) in [
            (ENV_PASSWORD_ON_FAILURE, StatusCheck::PasswordStatus),
            (ENV_SETUP_ON_FAILURE, StatusCheck::SetupStatus),
        ] {
            if let Some(value) = lookup(key) {
                let mode = value.parse::<OnFailure>().map_err(|e| {
                    ConfigError::InvalidValue {
                        key,
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
                config.failure_policy = config.failure_policy.with(check, mode);
            }
        }

        if let Some(value) = lookup(ENV_MAX_REDIRECT_HOPS) {
            let invalid = |reason: String| ConfigError::InvalidValue {
                key: ENV_MAX_REDIRECT_HOPS,
                value: value.clone(),
                reason,
            };
            let hops: u32 = value.trim().parse().map_err(|e| invalid(format!("{e}")))?;
            if hops == 0 || hops > MAX_HOPS_LIMIT {
                return Err(invalid(format!("must be between 1 and {MAX_HOPS_LIMIT}")));
            }
            config.max_redirect_hops = hops;
        }

        Ok(config)
    }
}
