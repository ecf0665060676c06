//! Remote boundary consumed by the guard.
//!
//! Transport, retries and timeouts belong to implementations. The guard makes
//! at most one status call per fact for each evaluated route; every redirect
//! hop is checked again.

use std::sync::Arc;

use async_trait::async_trait;

use waypoint_auth::{CheckError, Identity, PasswordStatus, SetupStatus};

/// Identity endpoint and logout.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn fetch_identity(&self) -> Result<Identity, CheckError>;

    /// Invalidate the session remotely. Callers ignore the outcome beyond
    /// logging it.
    async fn logout(&self) -> Result<(), CheckError>;
}

/// Admin onboarding status endpoints.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// `GET /auth/password-status`
    async fn fetch_password_status(&self) -> Result<PasswordStatus, CheckError>;

    /// `GET /admin/setup-status`
    async fn fetch_setup_status(&self) -> Result<SetupStatus, CheckError>;
}

#[async_trait]
impl<T: IdentitySource + ?Sized> IdentitySource for Arc<T> {
    async fn fetch_identity(&self) -> Result<Identity, CheckError> {
        (**self).fetch_identity().await
    }

    async fn logout(&self) -> Result<(), CheckError> {
        (**self).logout().await
    }
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn fetch_password_status(&self) -> Result<PasswordStatus, CheckError> {
        (**self).fetch_password_status().await
    }

    async fn fetch_setup_status(&self) -> Result<SetupStatus, CheckError> {
        (**self).fetch_setup_status().await
    }
}
