use serde::{Deserialize, Serialize};

/// Body of `GET /auth/password-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStatus {
    pub requires_password: bool,
}

/// Body of `GET /admin/setup-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatus {
    pub signature_placement_complete: bool,
    pub email_and_forms_configured: bool,
}

impl SetupStatus {
    pub fn complete() -> Self {
        Self {
            signature_placement_complete: true,
            email_and_forms_configured: true,
        }
    }

    /// Both wizard stages must be finished.
    pub fn is_complete(&self) -> bool {
        self.signature_placement_complete && self.email_and_forms_configured
    }
}
