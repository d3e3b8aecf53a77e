//! Error types for the storage layer.
//!
//! Every variant means the same thing to the layers above: the session
//! can't be persisted, so the user has to be treated as logged out. The
//! variants only exist so the logs say *why*.

/// Errors that can occur while reading or writing persisted session data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend refused the operation (disabled, quota, lock
    /// poisoned, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the storage file failed.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The storage file exists but isn't a JSON object of strings.
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}
