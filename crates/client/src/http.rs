//! `reqwest` implementation of the guard's backend boundary.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use waypoint_auth::{CheckError, Identity, PasswordStatus, SessionStore, SetupStatus};
use waypoint_guard::{IdentitySource, StatusSource};

use crate::config::ClientConfig;
use crate::error::ClientError;

pub const IDENTITY_PATH: &str = "/auth/me";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const PASSWORD_STATUS_PATH: &str = "/auth/password-status";
pub const SETUP_STATUS_PATH: &str = "/admin/setup-status";

/// HTTP backend authenticating with the session's bearer token.
///
/// One request per call; no retries.
pub struct HttpBackend {
    config: ClientConfig,
    http: reqwest::Client,
    session: Arc<dyn SessionStore>,
}

impl HttpBackend {
    pub fn new(config: ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            http,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.config.endpoint(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    async fn send(&self, method: Method, path: &str) -> Result<Response, CheckError> {
        let response = self
            .request(method.clone(), path)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "backend responded");

        match status {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(CheckError::Unauthorized(status.as_u16()))
            }
            _ => Err(CheckError::Status(status.as_u16())),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CheckError> {
        let response = self.send(Method::GET, path).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CheckError::Decode(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> CheckError {
    if err.is_timeout() {
        CheckError::Timeout
    } else {
        CheckError::Transport(err.to_string())
    }
}

#[async_trait]
impl IdentitySource for HttpBackend {
    async fn fetch_identity(&self) -> Result<Identity, CheckError> {
        self.get_json(IDENTITY_PATH).await
    }

    async fn logout(&self) -> Result<(), CheckError> {
        self.send(Method::POST, LOGOUT_PATH).await.map(|_| ())
    }
}

#[async_trait]
impl StatusSource for HttpBackend {
    async fn fetch_password_status(&self) -> Result<PasswordStatus, CheckError> {
        self.get_json(PASSWORD_STATUS_PATH).await
    }

    async fn fetch_setup_status(&self) -> Result<SetupStatus, CheckError> {
        self.get_json(SETUP_STATUS_PATH).await
    }
}
