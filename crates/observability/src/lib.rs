//! Process-wide tracing setup.

pub mod tracing;

pub use crate::tracing::{ENV_LOG_FORMAT, LogFormat};

/// Initialize tracing using the format from `WAYPOINT_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
