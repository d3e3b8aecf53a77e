//! # Farmgate
//!
//! Client-side session guard for the farm portal.
//!
//! Farmgate keeps a login alive only while it should be: the token's
//! recorded expiry hasn't passed, the backend still accepts it, and the
//! user has done something in the last two hours. When any of that stops
//! being true the stored token is cleared, the user sees a notice, and the
//! app goes back to the login view.
//!
//! ## Quick Start
//!
//! ```rust
//! use farmgate::prelude::*;
//!
//! /// Accepts one password. A real host would use `HttpBackend`.
//! struct Portal;
//!
//! impl AuthBackend for Portal {
//!     async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, SessionError> {
//!         match credentials.password.as_str() {
//!             "pw" => Ok(LoginGrant::new("tok").with_user_id(credentials.username.clone())),
//!             _ => Err(SessionError::AuthFailed("wrong password".into())),
//!         }
//!     }
//!
//!     async fn check_session(&self, _token: &str) -> Result<bool, SessionError> {
//!         Ok(true)
//!     }
//!
//!     async fn delete_account(&self, _token: &str) -> Result<(), SessionError> {
//!         Ok(())
//!     }
//! }
//!
//! struct Screen;
//!
//! impl Presenter for Screen {
//!     async fn show_notice(&self, notice: &Notice) {
//!         println!("{}: {}", notice.title, notice.message);
//!     }
//!
//!     fn redirect_to_login(&self) {}
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), FarmgateError> {
//! let guard = Farmgate::builder()
//!     .config(GuardConfig::from_json_str(r#"{ "inactivity_timeout_secs": 900 }"#)?)
//!     .start(MemoryStorage::new(), Portal, Screen)?;
//!
//! let session = guard.login(Credentials::new("kim", "pw")).await?;
//! assert!(session.is_authenticated);
//!
//! // Wire this to the UI's keydown/scroll/wheel/mousedown/touchstart handlers.
//! guard.activity_event("keydown")?;
//!
//! guard.logout().await?;
//! assert!(!guard.snapshot().is_authenticated);
//! guard.teardown().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod error;
mod guard;
pub mod telemetry;

pub use builder::{Farmgate, FarmgateBuilder};
pub use config::{
    DEFAULT_INACTIVITY_TIMEOUT_SECS, DEFAULT_REVALIDATION_INTERVAL_SECS,
    DEFAULT_TOKEN_TTL_SECS, GuardConfig, MAX_DURATION_SECS,
};
pub use error::FarmgateError;
pub use guard::GuardHandle;

/// Everything a host needs, in one import.
pub mod prelude {
    pub use crate::{Farmgate, FarmgateBuilder, FarmgateError, GuardConfig, GuardHandle};

    pub use farmgate_backend::{BackendConfig, BackendError, HttpBackend};
    pub use farmgate_monitor::{ActivityKind, MonitorConfig, TickerConfig};
    pub use farmgate_session::{
        AuthBackend, Credentials, LoginGrant, LogoutReason, Notice, Presenter,
        Session, SessionConfig, SessionError, SessionState, Transition,
    };
    pub use farmgate_store::{
        Clock, FileStorage, MemoryStorage, Storage, StoreError, SystemClock,
        TokenStore, TokioClock,
    };
}
