//! [`AuthBackend`] over the portal's REST API, using `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use farmgate_session::{AuthBackend, Credentials, LoginGrant, SessionError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{BackendConfig, BackendError};

/// Tracing target for backend requests.
pub const TRACING_TARGET: &str = "farmgate_backend::http";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Body of `POST /auth/login`. Every field is optional on the wire; a
/// missing `success` counts as `false`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoginResponse {
    success: bool,
    token: Option<String>,
    user_id: Option<String>,
    expires_in_ms: Option<u64>,
    message: Option<String>,
}

/// Body of `GET /auth/status`. A missing `valid` field means valid.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusResponse {
    valid: Option<bool>,
}

// ---------------------------------------------------------------------------
// Response interpretation
// ---------------------------------------------------------------------------

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Turns a login response into a grant.
pub(crate) fn interpret_login(status: u16, body: &str) -> Result<LoginGrant, BackendError> {
    match status {
        s if is_success(s) => {
            let response: LoginResponse = serde_json::from_str(body).map_err(|source| {
                BackendError::InvalidResponse {
                    endpoint: "login",
                    source,
                }
            })?;
            let token = match response.token {
                Some(token) if response.success && !token.is_empty() => token,
                _ => {
                    return Err(BackendError::LoginRejected(
                        response.message.unwrap_or_else(|| "login failed".to_string()),
                    ));
                }
            };
            let mut grant = LoginGrant::new(token);
            if let Some(user_id) = response.user_id {
                grant = grant.with_user_id(user_id);
            }
            if let Some(ms) = response.expires_in_ms.filter(|ms| *ms > 0) {
                grant = grant.with_ttl(Duration::from_millis(ms));
            }
            Ok(grant)
        }
        400 | 401 | 403 => {
            // Error bodies are best effort; the status alone is enough.
            let message = serde_json::from_str::<LoginResponse>(body)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            Err(BackendError::LoginRejected(message))
        }
        _ => Err(BackendError::UnexpectedStatus {
            endpoint: "login",
            status,
        }),
    }
}

/// Turns a status-check response into "still valid?".
pub(crate) fn interpret_status(status: u16, body: &str) -> Result<bool, BackendError> {
    match status {
        s if is_success(s) => {
            if body.trim().is_empty() {
                return Ok(true);
            }
            let response: StatusResponse = serde_json::from_str(body).map_err(|source| {
                BackendError::InvalidResponse {
                    endpoint: "status",
                    source,
                }
            })?;
            Ok(response.valid.unwrap_or(true))
        }
        401 | 403 => Ok(false),
        _ => Err(BackendError::UnexpectedStatus {
            endpoint: "status",
            status,
        }),
    }
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

struct HttpBackendInner {
    http: Client,
    config: BackendConfig,
}

/// The portal's auth API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config doesn't validate or the HTTP client
    /// can't be created.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        debug!(
            target: TRACING_TARGET,
            base_url = %config.base_url,
            timeout_ms = config.timeout.as_millis() as u64,
            "backend client created"
        );

        Ok(Self {
            inner: Arc::new(HttpBackendInner { http, config }),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    /// `POST {login_path}`.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, BackendError> {
        let response = self
            .inner
            .http
            .post(self.inner.config.login_url())
            .json(&LoginRequest {
                username: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let result = interpret_login(status, &body);
        match &result {
            Ok(_) => info!(target: TRACING_TARGET, username = %credentials.username, "login accepted"),
            Err(e) => warn!(target: TRACING_TARGET, username = %credentials.username, error = %e, "login refused"),
        }
        result
    }

    /// `GET {status_path}` with the bearer token.
    pub async fn check_session(&self, token: &str) -> Result<bool, BackendError> {
        let response = self
            .inner
            .http
            .get(self.inner.config.status_url())
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let valid = interpret_status(status, &body)?;
        debug!(target: TRACING_TARGET, status, valid, "session status checked");
        Ok(valid)
    }

    /// `DELETE {account_path}` with the bearer token.
    pub async fn delete_account(&self, token: &str) -> Result<(), BackendError> {
        let response = self
            .inner
            .http
            .delete(self.inner.config.account_url())
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status().as_u16();

        if !is_success(status) {
            warn!(target: TRACING_TARGET, status, "account deletion refused");
            return Err(BackendError::UnexpectedStatus {
                endpoint: "account",
                status,
            });
        }
        info!(target: TRACING_TARGET, "account deleted on backend");
        Ok(())
    }
}

impl AuthBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, SessionError> {
        Ok(HttpBackend::login(self, credentials).await?)
    }

    async fn check_session(&self, token: &str) -> Result<bool, SessionError> {
        Ok(HttpBackend::check_session(self, token).await?)
    }

    async fn delete_account(&self, token: &str) -> Result<(), SessionError> {
        Ok(HttpBackend::delete_account(self, token).await?)
    }
}
