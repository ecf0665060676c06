//! Resolve navigations against a live backend and print what would be shown.
//!
//! ```text
//! WAYPOINT_AUTH_TOKEN=... waypoint-probe /dashboard /admin/settings
//! ```
//!
//! One JSON line per path on stdout; logs go to stderr.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, bail};

use waypoint_auth::{InMemorySessionStore, SessionToken};
use waypoint_client::{ClientConfig, HttpBackend};
use waypoint_guard::{AuthContext, Guard, GuardConfig, NavigationOutcome, Navigator, RouteTable};

const ENV_AUTH_TOKEN: &str = "WAYPOINT_AUTH_TOKEN";

/// Writes each committed navigation to stdout as a JSON line.
struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn commit(&self, outcome: &NavigationOutcome) {
        match serde_json::to_string(outcome) {
            Ok(line) => {
                let mut out = std::io::stdout().lock();
                if let Err(err) = writeln!(out, "{line}") {
                    tracing::error!(error = %err, "failed to write outcome");
                }
            }
            Err(err) => tracing::error!(error = %err, "failed to encode outcome"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    waypoint_observability::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: waypoint-probe <path>...");
    }

    let guard_config = GuardConfig::from_env().context("invalid guard configuration")?;
    let client_config = ClientConfig::from_env().context("invalid client configuration")?;
    tracing::info!(api_url = %client_config.api_url, "probing backend");

    let session = Arc::new(InMemorySessionStore::new());
    let backend = Arc::new(
        HttpBackend::new(client_config, session.clone()).context("failed to build HTTP backend")?,
    );
    let auth = Arc::new(AuthContext::new(session, backend.clone()));

    match std::env::var(ENV_AUTH_TOKEN) {
        Ok(token) if !token.trim().is_empty() => auth.sign_in(SessionToken::new(token)).await,
        _ => tracing::warn!("{ENV_AUTH_TOKEN} not set; navigating without a session"),
    }

    let guard = Guard::new(
        Arc::new(RouteTable::onboarding_default()),
        auth,
        backend,
        Arc::new(StdoutNavigator),
        guard_config,
    );

    for path in &paths {
        if let Err(err) = guard.navigate(path).await {
            tracing::warn!(path = %path, error = %err, "navigation not committed");
        }
    }

    Ok(())
}
