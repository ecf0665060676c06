//! `waypoint-auth`: session, identity and onboarding model.
//!
//! Pure data and the local session probe. No network access lives here.

pub mod error;
pub mod identity;
pub mod onboarding;
pub mod roles;
pub mod session;

pub use error::{CheckError, LoadError};
pub use identity::{Identity, IdentityState, UserId};
pub use onboarding::{PasswordStatus, SetupStatus};
pub use roles::{Role, UnknownRole};
pub use session::{InMemorySessionStore, SessionProbe, SessionStore, SessionToken};
