//! Navigation guard orchestration.
//!
//! Each navigation walks a small state machine:
//!
//! ```text
//! Start → SessionChecked → IdentityResolved → StatusChecked → Decided → Executed
//! ```
//!
//! Remote facts are fetched only when the policy asks for them, in the order
//! it asks. Navigations run one at a time in submission order; a navigation
//! that is superseded before it commits is dropped and its decision never
//! reaches the [`Navigator`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};

use waypoint_auth::CheckError;

use crate::backend::StatusSource;
use crate::config::GuardConfig;
use crate::context::AuthContext;
use crate::decision::{Decision, Reason, Verdict};
use crate::policy::{
    AccessPolicy, DecisionExplanation, Evaluation, Fact, Facts, Resolution, StatusCheck,
};
use crate::route::{Landmark, RouteDef, RouteTable, normalize_path};

/// Host-side sink that performs committed navigations.
pub trait Navigator: Send + Sync {
    fn commit(&self, outcome: &NavigationOutcome);
}

/// One redirect taken while resolving a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hop {
    pub from: String,
    pub to: Landmark,
    pub reason: Reason,
}

/// A navigation that was decided and handed to the navigator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationOutcome {
    pub sequence: u64,
    pub requested: String,
    pub route: String,
    pub path: String,
    pub reason: Reason,
    pub trail: Vec<Hop>,
    /// The redirect bound was exceeded and the fallback route was committed.
    pub fallback: bool,
    /// Rule and facts behind the decision for the committed route.
    pub explanation: DecisionExplanation,
    pub decided_at: DateTime<Utc>,
}

impl NavigationOutcome {
    pub fn hops(&self) -> usize {
        self.trail.len()
    }

    pub fn was_redirected(&self) -> bool {
        !self.trail.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation #{sequence} was superseded by #{latest}")]
    Superseded { sequence: u64, latest: u64 },
}

/// The navigation guard.
pub struct Guard {
    routes: Arc<RouteTable>,
    policy: AccessPolicy,
    auth: Arc<AuthContext>,
    status: Arc<dyn StatusSource>,
    navigator: Arc<dyn Navigator>,
    config: GuardConfig,
    turn: Mutex<()>,
    submitted: AtomicU64,
}

impl Guard {
    pub fn new(
        routes: Arc<RouteTable>,
        auth: Arc<AuthContext>,
        status: Arc<dyn StatusSource>,
        navigator: Arc<dyn Navigator>,
        config: GuardConfig,
    ) -> Self {
        Self {
            routes,
            policy: AccessPolicy::new(config.failure_policy),
            auth,
            status,
            navigator,
            config,
            turn: Mutex::new(()),
            submitted: AtomicU64::new(0),
        }
    }

    /// Discard every navigation submitted so far that has not committed yet.
    pub fn cancel_pending(&self) {
        let latest = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(latest, "pending navigations cancelled");
    }

    /// Resolve and execute a navigation to `path`.
    pub async fn navigate(&self, path: &str) -> Result<NavigationOutcome, NavigationError> {
        let sequence = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        let span = info_span!("navigation", sequence, path = %path);
        self.run(sequence, path).instrument(span).await
    }

    async fn run(&self, sequence: u64, requested: &str) -> Result<NavigationOutcome, NavigationError> {
        let _turn = self.turn.lock().await;
        self.ensure_current(sequence)?;

        let (mut route, mut path) = match self.routes.find(requested) {
            Some(route) => (route, normalize_path(requested).to_string()),
            None => {
                let fallback = self.routes.landmark(Landmark::Dashboard);
                debug!(fallback = %fallback.path, "no route matches; using fallback");
                (fallback, fallback.path.to_string())
            }
        };
        let mut trail: Vec<Hop> = Vec::new();

        let (reason, fallback, explanation) = loop {
            let (verdict, explanation) = self.resolve(sequence, route).await?;
            match verdict.decision {
                Decision::Allow => break (verdict.reason, false, explanation),
                Decision::RedirectTo(target) => {
                    trail.push(Hop {
                        from: path.clone(),
                        to: target,
                        reason: verdict.reason,
                    });
                    if trail.len() > self.config.max_redirect_hops as usize {
                        error!(hops = trail.len(), "redirect bound exceeded; settling on an allowed route");
                        let (settled, explanation) = self.settle(sequence, target).await?;
                        route = settled;
                        path = route.path.to_string();
                        break (Reason::LoopBroken, true, explanation);
                    }
                    debug!(from = %path, to = %target, reason = ?verdict.reason, "following redirect");
                    route = self.routes.landmark(target);
                    path = route.path.to_string();
                }
            }
        };

        self.ensure_current(sequence)?;

        let outcome = NavigationOutcome {
            sequence,
            requested: requested.to_string(),
            route: route.name.to_string(),
            path,
            reason,
            trail,
            fallback,
            explanation,
            decided_at: Utc::now(),
        };
        info!(
            committed = %outcome.path,
            redirected = outcome.was_redirected(),
            hops = outcome.hops(),
            reason = ?outcome.reason,
            "navigation executed"
        );
        self.navigator.commit(&outcome);
        Ok(outcome)
    }

    /// Pick the route to commit once the redirect bound is exceeded.
    ///
    /// Candidates are the pending redirect target, then the session's home
    /// route; the first one the policy allows wins. Login is committed when
    /// neither is allowed.
    async fn settle(
        &self,
        sequence: u64,
        target: Landmark,
    ) -> Result<(&RouteDef, DecisionExplanation), NavigationError> {
        for candidate in [self.routes.landmark(target), self.home_route()] {
            let (verdict, explanation) = self.resolve(sequence, candidate).await?;
            if verdict.decision == Decision::Allow {
                return Ok((candidate, explanation));
            }
            debug!(candidate = %candidate.path, reason = ?verdict.reason, "fallback candidate rejected");
        }

        let login = self.routes.landmark(Landmark::Login);
        let (_, explanation) = self.resolve(sequence, login).await?;
        warn!("no fallback candidate is allowed; committing login");
        Ok((login, explanation))
    }

    /// Evaluate one route, fetching remote facts as the policy asks for them.
    async fn resolve(
        &self,
        sequence: u64,
        route: &RouteDef,
    ) -> Result<(Verdict, DecisionExplanation), NavigationError> {
        let mut facts = Facts::new(self.auth.has_session());
        debug!(state = "session_checked", route = %route.name, session = facts.session);

        loop {
            let fact = match self.policy.evaluate(route, &facts) {
                Evaluation::Decided(verdict) => {
                    let explanation = self.policy.explain(route, &facts);
                    debug!(
                        state = "decided",
                        route = %route.name,
                        decision = ?verdict.decision,
                        reason = ?verdict.reason,
                        explanation = %explanation.message
                    );
                    return Ok((verdict, explanation));
                }
                Evaluation::Needs(fact) => fact,
            };

            match fact {
                Fact::Identity => {
                    facts.identity = match self.auth.ensure_identity().await {
                        Ok(identity) => Resolution::Resolved(identity),
                        Err(err) => {
                            warn!(error = %err, "identity unavailable; session is no longer valid");
                            facts.session = self.auth.has_session();
                            Resolution::Failed
                        }
                    };
                    debug!(state = "identity_resolved", outcome = facts.identity.label());
                }
                Fact::PasswordStatus => {
                    facts.password = self
                        .check(StatusCheck::PasswordStatus, self.status.fetch_password_status())
                        .await;
                    debug!(state = "status_checked", check = "password_status", outcome = facts.password.label());
                }
                Fact::SetupStatus => {
                    facts.setup = self
                        .check(StatusCheck::SetupStatus, self.status.fetch_setup_status())
                        .await;
                    debug!(state = "status_checked", check = "setup_status", outcome = facts.setup.label());
                }
            }

            self.ensure_current(sequence)?;
        }
    }

    async fn check<T, F>(&self, check: StatusCheck, fetch: F) -> Resolution<T>
    where
        F: Future<Output = Result<T, CheckError>>,
    {
        match fetch.await {
            Ok(value) => Resolution::Resolved(value),
            Err(err) => {
                warn!(
                    check = check.as_str(),
                    error = %err,
                    transient = err.is_transient(),
                    on_failure = ?self.policy.failure_policy().on_failure(check),
                    "status check failed"
                );
                Resolution::Failed
            }
        }
    }

    fn home_route(&self) -> &RouteDef {
        if self.auth.has_session() {
            self.routes.landmark(Landmark::Dashboard)
        } else {
            self.routes.landmark(Landmark::Login)
        }
    }

    fn ensure_current(&self, sequence: u64) -> Result<(), NavigationError> {
        let latest = self.submitted.load(Ordering::SeqCst);
        if latest != sequence {
            debug!(latest, "navigation superseded; discarding");
            return Err(NavigationError::Superseded { sequence, latest });
        }
        Ok(())
    }
}
