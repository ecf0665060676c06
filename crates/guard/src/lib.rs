//! `waypoint-guard`: route access policy and navigation guard.
//!
//! - [`route`]: route registry and requirement metadata
//! - [`policy`]: pure access decisions over resolved facts
//! - [`loader`] / [`context`]: session and cached identity
//! - [`orchestrator`]: per-navigation fact resolution, redirects and commit

pub mod backend;
pub mod config;
pub mod context;
pub mod decision;
pub mod loader;
pub mod orchestrator;
pub mod policy;
pub mod route;

pub use backend::{IdentitySource, StatusSource};
pub use config::{ConfigError, GuardConfig};
pub use context::AuthContext;
pub use decision::{Decision, Reason, Verdict};
pub use loader::IdentityLoader;
pub use orchestrator::{Guard, Hop, NavigationError, NavigationOutcome, Navigator};
pub use policy::{
    AccessPolicy, DecisionExplanation, Evaluation, Fact, Facts, FailurePolicy, OnFailure,
    Resolution, StatusCheck,
};
pub use route::{Landmark, RouteDef, RouteRequirement, RouteTable, RouteTableError};
