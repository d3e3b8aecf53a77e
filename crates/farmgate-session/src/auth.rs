//! The backend seam: login, revalidation, account deletion.
//!
//! farmgate doesn't talk to any particular server itself. The portal's REST
//! API is one implementation (`farmgate-backend`'s `HttpBackend`); tests
//! use in-memory fakes; a demo can accept anyone.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::SessionError;

/// What the user typed into the login form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Passwords never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    /// Opaque bearer token.
    pub token: String,
    /// The backend's identifier for the user, if it sent one. Used to
    /// namespace per-user cached data.
    pub user_id: Option<String>,
    /// Lifetime the backend granted. `None` means "use the configured
    /// default".
    pub ttl: Option<Duration>,
}

impl LoginGrant {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: None,
            ttl: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// The remote authority behind the session.
///
/// # Trait bounds
///
/// - `Send + Sync` → the backend lives inside the guard's actor task.
/// - `'static` → it lives as long as the guard.
///
/// # Example
///
/// ```rust
/// use farmgate_session::{AuthBackend, Credentials, LoginGrant, SessionError};
///
/// /// Lets everyone in. Only for demos.
/// struct OpenDoor;
///
/// impl AuthBackend for OpenDoor {
///     async fn login(
///         &self,
///         credentials: &Credentials,
///     ) -> Result<LoginGrant, SessionError> {
///         Ok(LoginGrant::new(format!("demo-{}", credentials.username)))
///     }
///
///     async fn check_session(&self, _token: &str) -> Result<bool, SessionError> {
///         Ok(true)
///     }
///
///     async fn delete_account(&self, _token: &str) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges credentials for a token.
    ///
    /// # Returns
    /// - `Ok(LoginGrant)`: the backend accepted the credentials
    /// - `Err(SessionError::AuthFailed)`: it didn't
    /// - `Err(SessionError::Backend)`: it couldn't be asked
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginGrant, SessionError>> + Send;

    /// Asks whether `token` is still accepted.
    ///
    /// `Ok(false)` means the backend explicitly rejected it. Any `Err` is
    /// treated as a rejection too (the controller fails closed).
    fn check_session(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<bool, SessionError>> + Send;

    /// Deletes the account that owns `token`.
    fn delete_account(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

impl<B: AuthBackend> AuthBackend for Arc<B> {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginGrant, SessionError>> + Send {
        (**self).login(credentials)
    }

    fn check_session(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<bool, SessionError>> + Send {
        (**self).check_session(token)
    }

    fn delete_account(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send {
        (**self).delete_account(token)
    }
}
