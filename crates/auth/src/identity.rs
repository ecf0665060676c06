use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::Role;

/// Identifier of an application user, as reported by the identity endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Resolved profile of the signed-in user.
///
/// Only `role` and `is_admin` feed access decisions. Any other fields the
/// identity endpoint returns are kept verbatim in `profile` and never
/// inspected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,

    pub role: Role,

    /// Admin capability. Distinct from `role`: an identity with this flag
    /// satisfies every lower requirement whatever its role says.
    #[serde(default)]
    pub is_admin: bool,

    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl Identity {
    pub fn new(role: Role, is_admin: bool) -> Self {
        Self {
            id: None,
            role,
            is_admin,
            profile: Map::new(),
        }
    }

    /// Manager-level access: a manager or admin role, or the admin capability.
    pub fn satisfies_manager(&self) -> bool {
        self.is_admin || self.role.is_manager_or_above()
    }

    /// Admin-level access is granted by the capability flag only.
    pub fn satisfies_admin(&self) -> bool {
        self.is_admin
    }
}

/// Lifecycle of the cached identity.
///
/// `Absent → Loading → Loaded | Failed`; a sign-out returns it to `Absent`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum IdentityState {
    #[default]
    Absent,
    Loading,
    Loaded(Identity),
    Failed,
}

impl IdentityState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, IdentityState::Loaded(_))
    }
}
