use std::sync::RwLock;

/// Opaque session credential.
///
/// The token is never parsed client-side; its presence is the only fact
/// access decisions consume. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Synchronous, side-effect free read of local credential presence.
pub trait SessionProbe: Send + Sync {
    fn has_session(&self) -> bool;
}

/// Local credential storage.
///
/// Set at sign-in, cleared at sign-out or when the identity behind the
/// credential cannot be loaded.
pub trait SessionStore: SessionProbe {
    fn token(&self) -> Option<SessionToken>;

    fn store(&self, token: SessionToken);

    fn clear(&self);
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    token: RwLock<Option<SessionToken>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl SessionProbe for InMemorySessionStore {
    fn has_session(&self) -> bool {
        // A poisoned lock reads as signed out.
        self.token
            .read()
            .map(|token| token.as_ref().is_some_and(|t| !t.as_str().is_empty()))
            .unwrap_or(false)
    }
}

impl SessionStore for InMemorySessionStore {
    fn token(&self) -> Option<SessionToken> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    fn store(&self, token: SessionToken) {
        match self.token.write() {
            Ok(mut slot) => *slot = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    fn clear(&self) {
        match self.token.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}
