//! Unified error type for farmgate.

use farmgate_backend::BackendError;
use farmgate_session::SessionError;
use farmgate_store::StoreError;

/// Every error a host of the guard can see.
///
/// Store, session and backend errors convert in with `?`; the rest come
/// from config loading and from talking to a guard that has stopped.
#[derive(Debug, thiserror::Error)]
pub enum FarmgateError {
    /// Token storage failed (file unreadable, storage unavailable).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session operation failed (bad credentials, not logged in).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The HTTP backend couldn't be built.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A config file couldn't be read.
    #[error("config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// A config file wasn't valid JSON for `GuardConfig`.
    #[error("config file: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The config is readable but can't be used.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The guard task has stopped (torn down, or every handle dropped).
    #[error("session guard is not running")]
    GuardStopped,
}
