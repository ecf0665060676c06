//! Access policy evaluation.
//!
//! [`AccessPolicy::evaluate`] is a pure function of a route and the facts
//! resolved so far. When a rule needs a fact that has not been fetched yet,
//! evaluation stops with [`Evaluation::Needs`] and the orchestrator resumes it
//! once the fact is available. Rules run in fixed precedence:
//!
//! 1. authentication
//! 2. admin password gate on restricted onboarding destinations
//! 3. manager requirement
//! 4. admin requirement (password, then setup completeness)
//! 5. "already signed in" redirect away from the login page
//!
//! - No IO
//! - No panics
//! - Same inputs always produce the same evaluation

use core::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use waypoint_auth::{Identity, PasswordStatus, Role, SetupStatus};

use crate::decision::{Decision, Reason, Verdict};
use crate::route::{Landmark, RouteDef, RouteRequirement};

/// How a failed status check is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Fail open: proceed as though the check passed.
    Allow,
    /// Fail closed: treat the check as unsatisfied.
    Deny,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid failure mode '{0}' (expected 'allow' or 'deny')")]
pub struct InvalidFailureMode(pub String);

impl FromStr for OnFailure {
    type Err = InvalidFailureMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" | "open" | "fail-open" => Ok(OnFailure::Allow),
            "deny" | "closed" | "fail-closed" => Ok(OnFailure::Deny),
            _ => Err(InvalidFailureMode(s.to_string())),
        }
    }
}

/// Remote status checks with a configurable failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCheck {
    PasswordStatus,
    SetupStatus,
}

impl StatusCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCheck::PasswordStatus => "password_status",
            StatusCheck::SetupStatus => "setup_status",
        }
    }
}

/// Per-check failure table.
///
/// Both checks fail open by default so a transient network error never locks
/// a legitimate admin out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailurePolicy {
    pub password_status: OnFailure,
    pub setup_status: OnFailure,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            password_status: OnFailure::Allow,
            setup_status: OnFailure::Allow,
        }
    }
}

impl FailurePolicy {
    pub fn on_failure(&self, check: StatusCheck) -> OnFailure {
        match check {
            StatusCheck::PasswordStatus => self.password_status,
            StatusCheck::SetupStatus => self.setup_status,
        }
    }

    pub fn with(mut self, check: StatusCheck, mode: OnFailure) -> Self {
        match check {
            StatusCheck::PasswordStatus => self.password_status = mode,
            StatusCheck::SetupStatus => self.setup_status = mode,
        }
        self
    }
}

/// Remote facts a rule may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fact {
    Identity,
    PasswordStatus,
    SetupStatus,
}

/// State of one remote fact within a navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Unresolved,
    Resolved(T),
    Failed,
}

impl<T> Default for Resolution<T> {
    fn default() -> Self {
        Resolution::Unresolved
    }
}

impl<T> Resolution<T> {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Unresolved => "unresolved",
            Resolution::Resolved(_) => "resolved",
            Resolution::Failed => "failed",
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Resolution::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

impl<T, E> From<Result<T, E>> for Resolution<T> {
    fn from(value: Result<T, E>) -> Self {
        match value {
            Ok(value) => Resolution::Resolved(value),
            Err(_) => Resolution::Failed,
        }
    }
}

/// Everything known about the current user while evaluating one navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Facts {
    pub session: bool,
    pub identity: Resolution<Identity>,
    pub password: Resolution<PasswordStatus>,
    pub setup: Resolution<SetupStatus>,
}

impl Facts {
    pub fn new(session: bool) -> Self {
        Self {
            session,
            identity: Resolution::Unresolved,
            password: Resolution::Unresolved,
            setup: Resolution::Unresolved,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<Resolution<Identity>>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<Resolution<PasswordStatus>>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_setup(mut self, setup: impl Into<Resolution<SetupStatus>>) -> Self {
        self.setup = setup.into();
        self
    }
}

impl From<Identity> for Resolution<Identity> {
    fn from(value: Identity) -> Self {
        Resolution::Resolved(value)
    }
}

impl From<PasswordStatus> for Resolution<PasswordStatus> {
    fn from(value: PasswordStatus) -> Self {
        Resolution::Resolved(value)
    }
}

impl From<SetupStatus> for Resolution<SetupStatus> {
    fn from(value: SetupStatus) -> Self {
        Resolution::Resolved(value)
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Decided(Verdict),
    Needs(Fact),
}

impl Evaluation {
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Evaluation::Decided(verdict) => Some(*verdict),
            Evaluation::Needs(_) => None,
        }
    }

    pub fn decision(&self) -> Option<Decision> {
        self.verdict().map(|v| v.decision)
    }
}

/// The navigation access policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    failure: FailurePolicy,
}

impl AccessPolicy {
    pub fn new(failure: FailurePolicy) -> Self {
        Self { failure }
    }

    pub fn failure_policy(&self) -> &FailurePolicy {
        &self.failure
    }

    pub fn evaluate(&self, route: &RouteDef, facts: &Facts) -> Evaluation {
        match self.decide(route, facts) {
            Ok(verdict) => Evaluation::Decided(forward_progress(route, verdict)),
            Err(fact) => Evaluation::Needs(fact),
        }
    }

    fn decide(&self, route: &RouteDef, facts: &Facts) -> Result<Verdict, Fact> {
        let req = route.requirement;

        if req.requires_auth && !facts.session {
            return Ok(Verdict::redirect(Landmark::Login, Reason::AuthenticationRequired));
        }

        let restricted = route
            .landmark
            .is_some_and(|l| l.is_restricted_onboarding_destination());
        if req.requires_auth && facts.session && restricted {
            let Some(identity) = identity(facts)? else {
                return Ok(identity_unavailable());
            };
            if identity.is_admin && self.password_required(facts)? {
                return Ok(Verdict::redirect(
                    Landmark::PasswordSetup,
                    Reason::PasswordSetupRequired,
                ));
            }
        }

        if req.requires_manager {
            if !facts.session {
                return Ok(Verdict::redirect(Landmark::Login, Reason::AuthenticationRequired));
            }
            let Some(identity) = identity(facts)? else {
                return Ok(identity_unavailable());
            };
            if !identity.satisfies_manager() {
                return Ok(Verdict::redirect(Landmark::Dashboard, Reason::ManagerRequired));
            }
        }

        if req.requires_admin {
            if !facts.session {
                return Ok(Verdict::redirect(Landmark::Login, Reason::AuthenticationRequired));
            }
            let Some(identity) = identity(facts)? else {
                return Ok(identity_unavailable());
            };
            if !identity.satisfies_admin() {
                return Ok(Verdict::redirect(Landmark::Dashboard, Reason::AdminRequired));
            }
            if !route.is(Landmark::PasswordSetup) && self.password_required(facts)? {
                return Ok(Verdict::redirect(
                    Landmark::PasswordSetup,
                    Reason::PasswordSetupRequired,
                ));
            }
            let onboarding = route.is(Landmark::AdminSetup) || route.is(Landmark::PasswordSetup);
            if !onboarding && !self.setup_complete(facts)? {
                return Ok(Verdict::redirect(Landmark::AdminSetup, Reason::SetupIncomplete));
            }
        }

        if route.is(Landmark::Login) && facts.session {
            let Some(identity) = identity(facts)? else {
                return Ok(identity_unavailable());
            };
            let home = if identity.is_admin {
                Landmark::AdminHome
            } else {
                Landmark::Dashboard
            };
            return Ok(Verdict::redirect(home, Reason::AlreadyAuthenticated));
        }

        Ok(Verdict::allow())
    }

    fn password_required(&self, facts: &Facts) -> Result<bool, Fact> {
        match &facts.password {
            Resolution::Unresolved => Err(Fact::PasswordStatus),
            Resolution::Resolved(status) => Ok(status.requires_password),
            Resolution::Failed => {
                Ok(self.failure.on_failure(StatusCheck::PasswordStatus) == OnFailure::Deny)
            }
        }
    }

    fn setup_complete(&self, facts: &Facts) -> Result<bool, Fact> {
        match &facts.setup {
            Resolution::Unresolved => Err(Fact::SetupStatus),
            Resolution::Resolved(status) => Ok(status.is_complete()),
            Resolution::Failed => {
                Ok(self.failure.on_failure(StatusCheck::SetupStatus) == OnFailure::Allow)
            }
        }
    }

    /// Evaluate and describe the outcome for diagnostics.
    pub fn explain(&self, route: &RouteDef, facts: &Facts) -> DecisionExplanation {
        let (verdict, pending, message) = match self.evaluate(route, facts) {
            Evaluation::Decided(verdict) => {
                let message = match verdict.decision {
                    Decision::Allow => format!("allow '{}': {}", route.path, verdict.reason),
                    Decision::RedirectTo(target) => {
                        format!("redirect '{}' to {}: {}", route.path, target, verdict.reason)
                    }
                };
                (Some(verdict), None, message)
            }
            Evaluation::Needs(fact) => {
                let message = format!("evaluation of '{}' waits for {:?}", route.path, fact);
                (None, Some(fact), message)
            }
        };

        DecisionExplanation {
            route: route.name.to_string(),
            path: route.path.to_string(),
            landmark: route.landmark,
            requirement: route.requirement,
            facts: FactsSnapshot::from(facts),
            verdict,
            pending,
            failure_policy: self.failure,
            message,
        }
    }
}

fn identity(facts: &Facts) -> Result<Option<&Identity>, Fact> {
    match &facts.identity {
        Resolution::Unresolved => Err(Fact::Identity),
        Resolution::Resolved(identity) => Ok(Some(identity)),
        Resolution::Failed => Ok(None),
    }
}

fn identity_unavailable() -> Verdict {
    Verdict::redirect(Landmark::Login, Reason::IdentityUnavailable)
}

/// A redirect back to the route under evaluation would never terminate.
fn forward_progress(route: &RouteDef, verdict: Verdict) -> Verdict {
    match verdict.decision {
        Decision::RedirectTo(target) if route.is(target) => {
            if verdict.reason != Reason::IdentityUnavailable {
                error!(
                    route = %route.name,
                    rule = ?verdict.reason,
                    "access rule redirected route to itself; allowing"
                );
            }
            Verdict {
                decision: Decision::Allow,
                reason: Reason::LoopBroken,
            }
        }
        _ => verdict,
    }
}

/// Serializable view of the facts consulted for a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactsSnapshot {
    pub session: bool,
    pub identity: &'static str,
    pub role: Option<Role>,
    pub is_admin: Option<bool>,
    pub password_status: &'static str,
    pub requires_password: Option<bool>,
    pub setup_status: &'static str,
    pub setup_complete: Option<bool>,
}

impl From<&Facts> for FactsSnapshot {
    fn from(facts: &Facts) -> Self {
        let identity = facts.identity.resolved();
        Self {
            session: facts.session,
            identity: facts.identity.label(),
            role: identity.map(|i| i.role),
            is_admin: identity.map(|i| i.is_admin),
            password_status: facts.password.label(),
            requires_password: facts.password.resolved().map(|p| p.requires_password),
            setup_status: facts.setup.label(),
            setup_complete: facts.setup.resolved().map(|s| s.is_complete()),
        }
    }
}

/// Why a navigation was (or would be) allowed or redirected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionExplanation {
    pub route: String,
    pub path: String,
    pub landmark: Option<Landmark>,
    pub requirement: RouteRequirement,
    pub facts: FactsSnapshot,
    pub verdict: Option<Verdict>,
    pub pending: Option<Fact>,
    pub failure_policy: FailurePolicy,
    pub message: String,
}
