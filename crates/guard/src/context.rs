use std::sync::Arc;

use tracing::{info, warn};

use waypoint_auth::{Identity, IdentityState, LoadError, SessionProbe, SessionStore, SessionToken};

use crate::backend::IdentitySource;
use crate::loader::IdentityLoader;

/// Session and identity state for one running application.
///
/// Created once at startup and handed to the guard; sign-in and sign-out are
/// the only ways to change the session from the outside.
pub struct AuthContext {
    session: Arc<dyn SessionStore>,
    identity: IdentityLoader,
    source: Arc<dyn IdentitySource>,
}

impl AuthContext {
    pub fn new(session: Arc<dyn SessionStore>, source: Arc<dyn IdentitySource>) -> Self {
        Self {
            identity: IdentityLoader::new(session.clone(), source.clone()),
            session,
            source,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.has_session()
    }

    pub async fn ensure_identity(&self) -> Result<Identity, LoadError> {
        self.identity.ensure_identity().await
    }

    pub async fn identity_state(&self) -> IdentityState {
        self.identity.state().await
    }

    /// Store a fresh credential. Any identity cached for a previous session
    /// is dropped.
    pub async fn sign_in(&self, token: SessionToken) {
        self.identity.invalidate().await;
        self.session.store(token);
        info!("session established");
    }

    /// Clear session and identity, then log out remotely (best effort).
    pub async fn sign_out(&self) {
        self.session.clear();
        self.identity.invalidate().await;
        if let Err(err) = self.source.logout().await {
            warn!(error = %err, "remote logout failed; local session already cleared");
        }
        info!("signed out");
    }
}
