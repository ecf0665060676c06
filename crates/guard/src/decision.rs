use serde::Serialize;

use crate::route::Landmark;

/// Outcome of evaluating one navigation against the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectTo(Landmark),
}

/// The policy rule that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Allowed,
    AuthenticationRequired,
    IdentityUnavailable,
    PasswordSetupRequired,
    ManagerRequired,
    AdminRequired,
    SetupIncomplete,
    AlreadyAuthenticated,
    /// A rule pointed the route at itself; navigation proceeds instead.
    LoopBroken,
}

impl Reason {
    pub fn describe(&self) -> &'static str {
        match self {
            Reason::Allowed => "all requirements satisfied",
            Reason::AuthenticationRequired => "route requires a session",
            Reason::IdentityUnavailable => "identity could not be loaded",
            Reason::PasswordSetupRequired => "admin must set a password first",
            Reason::ManagerRequired => "route requires manager access",
            Reason::AdminRequired => "route requires admin access",
            Reason::SetupIncomplete => "admin onboarding is not complete",
            Reason::AlreadyAuthenticated => "already signed in",
            Reason::LoopBroken => "redirect would target the current route",
        }
    }
}

impl core::fmt::Display for Reason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A decision together with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: Reason,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            reason: Reason::Allowed,
        }
    }

    pub fn redirect(target: Landmark, reason: Reason) -> Self {
        Self {
            decision: Decision::RedirectTo(target),
            reason,
        }
    }
}
