//! The session controller: every session state transition goes through here.
//!
//! It's responsible for:
//! - Restoring (or expiring) a persisted session at boot
//! - Logging in and out
//! - Recording user activity
//! - Periodic revalidation of the stored token
//! - Forced logouts, each with exactly one notice and one redirect
//!
//! # Concurrency note
//!
//! Every transition takes `&mut self`. The controller is owned by a single
//! task (the guard actor) and everything else reaches it through a channel,
//! so two transitions can never interleave. The `ExpiringNotified` state on
//! top of that makes any trigger that arrives mid-logout a no-op.

use farmgate_store::{Storage, TokenStore};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    AuthBackend, Credentials, LogoutReason, Presenter, Session,
    SessionConfig, SessionError, SessionState,
};

/// Result of the boot-time check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// Nothing stored; the user starts logged out.
    NoSession,
    /// A valid token was found and the session resumed.
    Restored { expires_at_ms: u64 },
    /// A token was found but had already expired; it was cleared and the
    /// user was notified.
    Expired,
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The session was checked and is still valid.
    Unchanged,
    /// There is no session, so there was nothing to check.
    NoSession,
    /// A logout was requested while not logged in (already logged out, or
    /// a logout already in progress). Nothing happened.
    Ignored,
    /// The session ended.
    LoggedOut { reason: LogoutReason },
}

/// The single authority for session state.
///
/// ## Lifecycle
///
/// ```text
/// init() ──→ [LoggedOut] ──login()──→ [LoggedIn] ──record_activity()─┐
///                 ↑                     │    ↑                      │
///                 │                     │    └──────────────────────┘
///                 │        logout() / force_logout() /
///                 │        check_login_status() / delete_account()
///                 │                     ▼
///                 └──────────── [ExpiringNotified]
/// ```
pub struct SessionController<S, B, P>
where
    S: Storage,
    B: AuthBackend,
    P: Presenter,
{
    store: TokenStore<S>,
    backend: B,
    presenter: P,
    config: SessionConfig,
    state: SessionState,
    /// The published snapshot. The controller is the only sender.
    session: watch::Sender<Session>,
}

impl<S, B, P> SessionController<S, B, P>
where
    S: Storage,
    B: AuthBackend,
    P: Presenter,
{
    /// Creates a controller in the `LoggedOut` state.
    ///
    /// Call [`init`](Self::init) before anything else to pick up a session
    /// persisted by a previous run.
    pub fn new(
        store: TokenStore<S>,
        backend: B,
        presenter: P,
        config: SessionConfig,
    ) -> Self {
        let (session, _) = watch::channel(Session::logged_out());
        Self {
            store,
            backend,
            presenter,
            config,
            state: SessionState::LoggedOut,
            session,
        }
    }

    /// Boot-time check, run once before any activity is processed.
    ///
    /// A token whose expiry already passed is cleared through the forced
    /// logout path right away; the session never shows as `LoggedIn`.
    pub async fn init(&mut self) -> BootOutcome {
        let stored = match self.store.get() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "token store unreadable at boot, starting logged out");
                self.publish_logged_out();
                return BootOutcome::NoSession;
            }
        };

        let Some(token) = stored.token.clone() else {
            // A stray expiry or user cache without a token is garbage.
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "failed to clear leftover session data");
            }
            self.publish_logged_out();
            debug!("no stored session at boot");
            return BootOutcome::NoSession;
        };

        let now = self.store.now_millis();
        let expires_at_ms = match stored.expires_at_ms {
            Some(at) if !stored.is_expired(now) => at,
            _ => {
                info!(expired_at = ?stored.expires_at_ms, now, "stored session already expired");
                self.end_session(LogoutReason::SessionExpired).await;
                return BootOutcome::Expired;
            }
        };

        let user_id = self.store.user_id().unwrap_or_else(|e| {
            warn!(error = %e, "could not read stored user id");
            None
        });

        self.state = SessionState::LoggedIn;
        self.session.send_replace(Session {
            state: SessionState::LoggedIn,
            token: Some(token),
            user_id,
            expires_at_ms: Some(expires_at_ms),
            last_activity_ms: Some(now),
            is_authenticated: true,
        });
        info!(expires_at_ms, "stored session restored");
        BootOutcome::Restored { expires_at_ms }
    }

    /// Logs in with the given credentials.
    ///
    /// On success the token is persisted with the backend's TTL (or
    /// [`SessionConfig::token_ttl`]), `is_authenticated` becomes true and
    /// `last_activity` is now.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyLoggedIn`]: log out first
    /// - [`SessionError::AuthFailed`] / [`SessionError::Backend`]: from
    ///   the backend; nothing was stored
    /// - [`SessionError::Store`]: the token couldn't be persisted; the
    ///   user stays logged out
    pub async fn login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<Session, SessionError> {
        if self.state != SessionState::LoggedOut {
            return Err(SessionError::AlreadyLoggedIn);
        }

        let grant = self.backend.login(credentials).await?;
        let ttl = grant.ttl.unwrap_or(self.config.token_ttl);

        let persisted = self.store.set(&grant.token, ttl).and_then(|at| {
            if let Some(user_id) = &grant.user_id {
                self.store.set_user_id(user_id)?;
            }
            Ok(at)
        });
        let expires_at_ms = match persisted {
            Ok(at) => at,
            Err(e) => {
                warn!(error = %e, "could not persist token, login abandoned");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to roll back partial token write");
                }
                return Err(SessionError::Store(e));
            }
        };

        let now = self.store.now_millis();
        self.state = SessionState::LoggedIn;
        let session = Session {
            state: SessionState::LoggedIn,
            token: Some(grant.token),
            user_id: grant.user_id,
            expires_at_ms: Some(expires_at_ms),
            last_activity_ms: Some(now),
            is_authenticated: true,
        };
        self.session.send_replace(session.clone());

        info!(
            user_id = ?session.user_id,
            username = %credentials.username,
            expires_at_ms,
            "logged in"
        );
        Ok(session)
    }

    /// Records a qualifying user action. Returns whether a session is
    /// active (and the inactivity timer should be pushed forward).
    pub fn record_activity(&mut self) -> bool {
        if !self.state.is_logged_in() {
            return false;
        }
        let now = self.store.now_millis();
        self.session
            .send_modify(|session| session.last_activity_ms = Some(now));
        true
    }

    /// The periodic revalidation check.
    ///
    /// Reads the token store fresh (another tab may have changed it), then
    /// asks the backend. Every failure ends the session with a notice:
    ///
    /// | finding                  | reason                |
    /// |--------------------------|-----------------------|
    /// | storage unreadable       | `StorageUnavailable`  |
    /// | no token                 | `MissingCredentials`  |
    /// | expiry passed            | `SessionExpired`      |
    /// | backend says invalid     | `SessionExpired`      |
    /// | backend unreachable      | `RevalidationFailed`  |
    pub async fn check_login_status(&mut self) -> Transition {
        if !self.state.is_logged_in() {
            return Transition::NoSession;
        }

        let stored = match self.store.get() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "token store unreadable during revalidation");
                return self.end_session(LogoutReason::StorageUnavailable).await;
            }
        };

        let Some(token) = stored.token.clone() else {
            return self.end_session(LogoutReason::MissingCredentials).await;
        };

        let now = self.store.now_millis();
        if stored.is_expired(now) {
            debug!(expires_at = ?stored.expires_at_ms, now, "token expired");
            return self.end_session(LogoutReason::SessionExpired).await;
        }

        match self.backend.check_session(&token).await {
            Ok(true) => {
                // Pick up a token another tab may have refreshed.
                self.session.send_modify(|session| {
                    session.token = Some(token);
                    session.expires_at_ms = stored.expires_at_ms;
                });
                debug!("session revalidated");
                Transition::Unchanged
            }
            Ok(false) => {
                info!("backend rejected the stored token");
                self.end_session(LogoutReason::SessionExpired).await
            }
            Err(e) => {
                warn!(error = %e, "revalidation failed, failing closed");
                self.end_session(LogoutReason::RevalidationFailed).await
            }
        }
    }

    /// Ends the session with a notice. Only acts from `LoggedIn`; every
    /// other state returns [`Transition::Ignored`].
    pub async fn force_logout(&mut self, reason: LogoutReason) -> Transition {
        if !self.state.is_logged_in() {
            debug!(%reason, state = %self.state, "forced logout ignored");
            return Transition::Ignored;
        }
        self.end_session(reason).await
    }

    /// Explicit, user-initiated logout. Same reset and redirect as a forced
    /// logout, without the notice.
    pub async fn logout(&mut self) -> Transition {
        self.force_logout(LogoutReason::UserRequested).await
    }

    /// Deletes the account on the backend, then ends the session.
    ///
    /// # Errors
    /// - [`SessionError::NotLoggedIn`]: nothing to delete
    /// - whatever the backend returned; the session is left untouched
    pub async fn delete_account(&mut self) -> Result<Transition, SessionError> {
        if !self.state.is_logged_in() {
            return Err(SessionError::NotLoggedIn);
        }
        let token = self
            .session
            .borrow()
            .token
            .clone()
            .ok_or(SessionError::NotLoggedIn)?;

        self.backend.delete_account(&token).await?;

        info!("account deleted");
        Ok(self.end_session(LogoutReason::AccountDeleted).await)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in()
    }

    /// A copy of the current snapshot.
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Subscribes to session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn store(&self) -> &TokenStore<S> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Clear, notify, redirect. The one code path every logout takes.
    ///
    /// Storage and the snapshot are reset *before* the notice is awaited,
    /// so nothing can read a live-looking session while the modal is up.
    async fn end_session(&mut self, reason: LogoutReason) -> Transition {
        self.state = SessionState::ExpiringNotified;

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear token store");
        }
        self.session.send_replace(Session {
            state: SessionState::ExpiringNotified,
            ..Session::logged_out()
        });

        if reason.is_forced() {
            info!(%reason, "forced logout");
        } else {
            info!("logged out");
        }

        if let Some(notice) = reason.notice() {
            self.presenter.show_notice(&notice).await;
        }
        self.presenter.redirect_to_login();

        self.state = SessionState::LoggedOut;
        self.publish_logged_out();
        Transition::LoggedOut { reason }
    }

    fn publish_logged_out(&mut self) {
        self.state = SessionState::LoggedOut;
        self.session.send_replace(Session::logged_out());
    }
}

// =========================================================================
// Tests
// =========================================================================
