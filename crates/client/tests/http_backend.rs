use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;

use waypoint_auth::{CheckError, InMemorySessionStore, Role, SessionProbe, SessionToken};
use waypoint_client::{ClientConfig, HttpBackend};
use waypoint_guard::{
    AuthContext, Guard, GuardConfig, IdentitySource, Landmark, NavigationOutcome, Navigator,
    RouteTable, StatusSource,
};

const TOKEN: &str = "good-token";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn backend(&self, token: Option<&str>) -> HttpBackend {
        let session = match token {
            Some(token) => InMemorySessionStore::with_token(SessionToken::new(token)),
            None => InMemorySessionStore::new(),
        };
        HttpBackend::new(ClientConfig::new(&self.base_url), Arc::new(session)).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn guarded(headers: &HeaderMap, body: serde_json::Value) -> Response {
    if authorized(headers) {
        axum::Json(body).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Backend of an admin who still has to place their signature.
fn onboarding_admin_api() -> Router {
    Router::new()
        .route(
            "/auth/me",
            get(|headers: HeaderMap| async move {
                guarded(
                    &headers,
                    json!({ "role": "admin", "isAdmin": true, "email": "admin@example.test" }),
                )
            }),
        )
        .route(
            "/auth/password-status",
            get(|headers: HeaderMap| async move {
                guarded(&headers, json!({ "requiresPassword": false }))
            }),
        )
        .route(
            "/admin/setup-status",
            get(|headers: HeaderMap| async move {
                guarded(
                    &headers,
                    json!({ "signaturePlacementComplete": false, "emailAndFormsConfigured": true }),
                )
            }),
        )
}

#[tokio::test]
async fn identity_is_fetched_with_bearer_token() {
    let srv = TestServer::spawn(onboarding_admin_api()).await;

    let identity = srv.backend(Some(TOKEN)).fetch_identity().await.unwrap();

    assert_eq!(identity.role, Role::Admin);
    assert!(identity.is_admin);
    assert_eq!(identity.profile["email"], "admin@example.test");
}

#[tokio::test]
async fn missing_or_wrong_token_is_unauthorized() {
    let srv = TestServer::spawn(onboarding_admin_api()).await;

    let err = srv.backend(None).fetch_identity().await.unwrap_err();
    assert_eq!(err, CheckError::Unauthorized(401));

    let err = srv.backend(Some("stale")).fetch_password_status().await.unwrap_err();
    assert_eq!(err, CheckError::Unauthorized(401));
}

#[tokio::test]
async fn status_endpoints_decode_camel_case() {
    let srv = TestServer::spawn(onboarding_admin_api()).await;
    let backend = srv.backend(Some(TOKEN));

    let password = backend.fetch_password_status().await.unwrap();
    assert!(!password.requires_password);

    let setup = backend.fetch_setup_status().await.unwrap();
    assert!(!setup.signature_placement_complete);
    assert!(setup.email_and_forms_configured);
    assert!(!setup.is_complete());
}

#[tokio::test]
async fn server_error_and_malformed_body_are_distinguished() {
    let app = Router::new()
        .route(
            "/admin/setup-status",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        )
        .route("/auth/password-status", get(|| async { "not json" }));
    let srv = TestServer::spawn(app).await;
    let backend = srv.backend(Some(TOKEN));

    let err = backend.fetch_setup_status().await.unwrap_err();
    assert_eq!(err, CheckError::Status(503));
    assert!(err.is_transient());

    let err = backend.fetch_password_status().await.unwrap_err();
    assert!(matches!(err, CheckError::Decode(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn slow_response_times_out() {
    let app = Router::new().route(
        "/auth/me",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            axum::Json(json!({ "role": "user" }))
        }),
    );
    let srv = TestServer::spawn(app).await;
    let backend = HttpBackend::new(
        ClientConfig::new(&srv.base_url).with_timeout(Duration::from_millis(50)),
        Arc::new(InMemorySessionStore::with_token(SessionToken::new(TOKEN))),
    )
    .unwrap();

    assert_eq!(backend.fetch_identity().await.unwrap_err(), CheckError::Timeout);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(
        ClientConfig::new(format!("http://{addr}")),
        Arc::new(InMemorySessionStore::with_token(SessionToken::new(TOKEN))),
    )
    .unwrap();

    let err = backend.fetch_identity().await.unwrap_err();
    assert!(matches!(err, CheckError::Transport(_)));
}

#[tokio::test]
async fn logout_posts_to_logout_endpoint() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/auth/logout",
        post(move |headers: HeaderMap| {
            let counter = counter.clone();
            async move {
                assert!(authorized(&headers));
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::NO_CONTENT
            }
        }),
    );
    let srv = TestServer::spawn(app).await;

    srv.backend(Some(TOKEN)).logout().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[derive(Default)]
struct LastCommit(std::sync::Mutex<Option<NavigationOutcome>>);

impl Navigator for LastCommit {
    fn commit(&self, outcome: &NavigationOutcome) {
        *self.0.lock().unwrap() = Some(outcome.clone());
    }
}

#[tokio::test]
async fn guard_over_http_sends_admin_to_setup_wizard() {
    let srv = TestServer::spawn(onboarding_admin_api()).await;

    let session = Arc::new(InMemorySessionStore::with_token(SessionToken::new(TOKEN)));
    let backend = Arc::new(
        HttpBackend::new(ClientConfig::new(&srv.base_url), session.clone()).unwrap(),
    );
    let navigator = Arc::new(LastCommit::default());
    let guard = Guard::new(
        Arc::new(RouteTable::onboarding_default()),
        Arc::new(AuthContext::new(session.clone(), backend.clone())),
        backend,
        navigator.clone(),
        GuardConfig::default(),
    );

    let outcome = guard.navigate("/admin/users").await.unwrap();

    assert_eq!(outcome.path, "/admin/setup");
    assert_eq!(outcome.trail[0].to, Landmark::AdminSetup);
    assert_eq!(navigator.0.lock().unwrap().as_ref(), Some(&outcome));
}

#[tokio::test]
async fn guard_over_http_signs_out_on_rejected_token() {
    let logouts = Arc::new(AtomicUsize::new(0));
    let counter = logouts.clone();
    let app = onboarding_admin_api().route(
        "/auth/logout",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::NO_CONTENT
            }
        }),
    );
    let srv = TestServer::spawn(app).await;

    let session = Arc::new(InMemorySessionStore::with_token(SessionToken::new("expired")));
    let backend = Arc::new(
        HttpBackend::new(ClientConfig::new(&srv.base_url), session.clone()).unwrap(),
    );
    let guard = Guard::new(
        Arc::new(RouteTable::onboarding_default()),
        Arc::new(AuthContext::new(session.clone(), backend.clone())),
        backend,
        Arc::new(LastCommit::default()),
        GuardConfig::default(),
    );

    let outcome = guard.navigate("/admin").await.unwrap();

    assert_eq!(outcome.path, "/login");
    assert!(!session.has_session());
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
}
