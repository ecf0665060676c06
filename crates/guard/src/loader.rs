//! Identity cache with single-flight loading.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use waypoint_auth::{Identity, IdentityState, LoadError, SessionProbe, SessionStore};

use crate::backend::IdentitySource;

/// Lazily loads and caches the signed-in user's identity.
///
/// The state lock is held across the fetch, so concurrent callers wait for
/// the in-flight request and then read its result: at most one fetch is ever
/// outstanding. The loader is the only writer of the identity state.
pub struct IdentityLoader {
    state: Mutex<IdentityState>,
    session: Arc<dyn SessionStore>,
    source: Arc<dyn IdentitySource>,
}

impl IdentityLoader {
    pub fn new(session: Arc<dyn SessionStore>, source: Arc<dyn IdentitySource>) -> Self {
        Self {
            state: Mutex::new(IdentityState::Absent),
            session,
            source,
        }
    }

    /// Return the cached identity, fetching it first if needed.
    ///
    /// A failed fetch is treated as an invalid session: the local session is
    /// cleared, the remote session is logged out, and `LoadError` is returned.
    pub async fn ensure_identity(&self) -> Result<Identity, LoadError> {
        let mut state = self.state.lock().await;

        if !self.session.has_session() {
            return Err(LoadError::NoSession);
        }
        if let IdentityState::Loaded(identity) = &*state {
            return Ok(identity.clone());
        }

        *state = IdentityState::Loading;
        debug!("loading identity");

        match self.source.fetch_identity().await {
            Ok(identity) => {
                debug!(role = %identity.role, is_admin = identity.is_admin, "identity loaded");
                *state = IdentityState::Loaded(identity.clone());
                Ok(identity)
            }
            Err(err) => {
                warn!(error = %err, transient = err.is_transient(), "identity load failed; signing out");
                *state = IdentityState::Failed;
                self.session.clear();
                if let Err(logout_err) = self.source.logout().await {
                    debug!(error = %logout_err, "remote logout after failed identity load did not succeed");
                }
                Err(LoadError::Fetch(err))
            }
        }
    }

    pub async fn state(&self) -> IdentityState {
        self.state.lock().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.is_loaded()
    }

    /// Drop the cached identity (sign-in of a new session, sign-out).
    pub async fn invalidate(&self) {
        *self.state.lock().await = IdentityState::Absent;
    }
}
