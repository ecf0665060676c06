//! `waypoint-client`: HTTP access to the identity and onboarding endpoints.

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpBackend;
