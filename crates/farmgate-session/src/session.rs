//! Session types: the snapshot, the state machine, the logout reasons.

use std::fmt;
use std::time::Duration;

use crate::Notice;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Token lifetime when the backend doesn't send one. Default: 2 hours.
    pub token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(2 * 60 * 60),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// ```text
///   LoggedOut ──(login)──→ LoggedIn ──(forced)──→ ExpiringNotified ──→ LoggedOut
///       ↑                     │
///       └──────(logout)───────┘
/// ```
///
/// - **LoggedOut**: no token, nothing to protect.
/// - **LoggedIn**: token stored, timers running.
/// - **ExpiringNotified**: storage already cleared, a notice is on screen,
///   the redirect comes next. Any further logout trigger in this state is
///   ignored, which is what keeps notices from stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn,
    ExpiringNotified,
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => write!(f, "LoggedOut"),
            Self::LoggedIn => write!(f, "LoggedIn"),
            Self::ExpiringNotified => write!(f, "ExpiringNotified"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The session as the rest of the application sees it.
///
/// Published through [`SessionController::subscribe`](crate::SessionController::subscribe)
/// after every change. `is_authenticated` is true only while a token is
/// held whose expiry was in the future at the last check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub expires_at_ms: Option<u64>,
    pub last_activity_ms: Option<u64>,
    pub is_authenticated: bool,
}

impl Session {
    /// The fully reset session (all fields absent, not authenticated).
    pub fn logged_out() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// LogoutReason
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoutReason {
    /// No qualifying activity for a whole inactivity timeout.
    Inactivity,
    /// The token vanished from storage (another tab logged out, storage
    /// was wiped).
    MissingCredentials,
    /// The stored expiry has passed, or the backend rejected the token.
    SessionExpired,
    /// The backend couldn't confirm the token.
    RevalidationFailed,
    /// Storage stopped working; the session can't be kept.
    StorageUnavailable,
    /// The user deleted their account.
    AccountDeleted,
    /// The user clicked "log out".
    UserRequested,
}

impl LogoutReason {
    /// Everything except an explicit logout is forced and gets a notice.
    pub fn is_forced(&self) -> bool {
        !matches!(self, Self::UserRequested)
    }

    /// The notice shown for this reason, or `None` for an explicit logout.
    pub fn notice(&self) -> Option<Notice> {
        let (title, message) = match self {
            Self::Inactivity => (
                "Logged out due to inactivity",
                "You were inactive for a long time, so you have been logged \
                 out to protect your account. Please log in again.",
            ),
            Self::MissingCredentials => (
                "Login required",
                "Your login information could not be found. Please log in \
                 again.",
            ),
            Self::SessionExpired => (
                "Session expired",
                "Your login session has expired. Please log in again.",
            ),
            Self::RevalidationFailed => (
                "Could not verify your login",
                "The server could not confirm your login. Please log in \
                 again.",
            ),
            Self::StorageUnavailable => (
                "Login could not be kept",
                "Local storage is unavailable, so your login cannot be kept. \
                 Please log in again.",
            ),
            Self::AccountDeleted => (
                "Account deleted",
                "Your account has been deleted. Thank you for using the \
                 portal.",
            ),
            Self::UserRequested => return None,
        };
        Some(Notice {
            reason: *self,
            title: title.to_string(),
            message: message.to_string(),
        })
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inactivity => "inactivity",
            Self::MissingCredentials => "missing credentials",
            Self::SessionExpired => "session expired",
            Self::RevalidationFailed => "revalidation failed",
            Self::StorageUnavailable => "storage unavailable",
            Self::AccountDeleted => "account deleted",
            Self::UserRequested => "user requested",
        };
        f.write_str(name)
    }
}
