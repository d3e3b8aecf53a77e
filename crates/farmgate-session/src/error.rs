//! Error types for the session layer.

use farmgate_store::StoreError;

/// Errors that can occur during session management.
///
/// Only user-initiated operations (login, account deletion) hand these back
/// to the caller. Failures during periodic revalidation are absorbed by the
/// controller and turned into a forced logout instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A session is already active. Log out first.
    #[error("already logged in")]
    AlreadyLoggedIn,

    /// The operation needs an active session.
    #[error("not logged in")]
    NotLoggedIn,

    /// The backend couldn't be reached or answered something unexpected.
    #[error("backend error: {0}")]
    Backend(String),

    /// The token couldn't be persisted, so the session can't be kept.
    #[error(transparent)]
    Store(#[from] StoreError),
}
