//! Integration tests for the session guard: controller, monitor and actor
//! running together.
//!
//! Every test runs with Tokio's clock paused. `sleep` then advances virtual
//! time instantly, and the guard task always gets to run before the clock
//! moves on, so "two hours of inactivity" takes microseconds and is fully
//! deterministic. The token store reads time from a `TokioClock`, so token
//! expiry follows the same virtual clock.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use farmgate::MAX_DURATION_SECS;
use farmgate::prelude::*;
use farmgate_store::USER_KEY_PREFIX;
use tokio::sync::Notify;
use tokio::time::sleep;

// =========================================================================
// Test doubles
// =========================================================================

#[derive(Default)]
struct MockBackend {
    /// Revalidation answer: `true` valid, `false` rejected.
    rejects_token: AtomicBool,
    unreachable: AtomicBool,
    checks: AtomicUsize,
}

impl AuthBackend for MockBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, SessionError> {
        if credentials.password != "pw" {
            return Err(SessionError::AuthFailed("wrong password".into()));
        }
        Ok(LoginGrant::new(format!("tok-{}", credentials.username))
            .with_user_id(credentials.username.clone()))
    }

    async fn check_session(&self, _token: &str) -> Result<bool, SessionError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SessionError::Backend("connection refused".into()));
        }
        Ok(!self.rejects_token.load(Ordering::SeqCst))
    }

    async fn delete_account(&self, _token: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Records notices and redirects. With `gated`, each notice stays "on
/// screen" until `release` is notified.
#[derive(Default)]
struct RecordingPresenter {
    notices: Mutex<Vec<Notice>>,
    redirects: AtomicUsize,
    gated: bool,
    release: Notify,
}

impl RecordingPresenter {
    fn gated() -> Self {
        Self {
            gated: true,
            ..Self::default()
        }
    }

    fn reasons(&self) -> Vec<LogoutReason> {
        self.notices.lock().unwrap().iter().map(|n| n.reason).collect()
    }

    fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Presenter for RecordingPresenter {
    async fn show_notice(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
        if self.gated {
            self.release.notified().await;
        }
    }

    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

// =========================================================================
// Helpers
// =========================================================================

const EPOCH_MS: u64 = 1_700_000_000_000;

struct Env {
    guard: GuardHandle,
    storage: Arc<MemoryStorage>,
    backend: Arc<MockBackend>,
    presenter: Arc<RecordingPresenter>,
}

fn config(inactivity_secs: u64, revalidation_secs: u64) -> GuardConfig {
    GuardConfig {
        inactivity_timeout_secs: inactivity_secs,
        revalidation_interval_secs: revalidation_secs,
        revalidation_jitter_ms: 0,
        ..GuardConfig::default()
    }
}

fn start_with(
    config: GuardConfig,
    storage: Arc<MemoryStorage>,
    presenter: RecordingPresenter,
) -> Env {
    let backend = Arc::new(MockBackend::default());
    let presenter = Arc::new(presenter);
    let guard = Farmgate::builder()
        .config(config)
        .clock(Arc::new(TokioClock::starting_at(EPOCH_MS)))
        .start(Arc::clone(&storage), Arc::clone(&backend), Arc::clone(&presenter))
        .expect("guard should start");
    Env {
        guard,
        storage,
        backend,
        presenter,
    }
}

fn start(config: GuardConfig) -> Env {
    start_with(
        config,
        Arc::new(MemoryStorage::new()),
        RecordingPresenter::default(),
    )
}

fn creds() -> Credentials {
    Credentials::new("grower", "pw")
}

/// A token store over `storage` using the same virtual epoch as the guard.
fn seed_store(storage: &Arc<MemoryStorage>) -> TokenStore<Arc<MemoryStorage>> {
    TokenStore::new(
        Arc::clone(storage),
        Arc::new(TokioClock::starting_at(EPOCH_MS)),
    )
}

// =========================================================================
// Inactivity
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_inactivity_timeout_forces_logout_once() {
    let env = start(config(60, 3600));
    env.guard.login(creds()).await.unwrap();

    sleep(Duration::from_secs(61)).await;

    let session = env.guard.snapshot();
    assert_eq!(session.state, SessionState::LoggedOut);
    assert!(!session.is_authenticated);
    assert_eq!(env.presenter.reasons(), vec![LogoutReason::Inactivity]);
    assert_eq!(env.presenter.redirects(), 1);
    assert!(env.storage.is_empty(), "token store should be cleared");
}

#[tokio::test(start_paused = true)]
async fn test_activity_pushes_inactivity_deadline() {
    let env = start(config(60, 3600));
    env.guard.login(creds()).await.unwrap();

    sleep(Duration::from_secs(50)).await;
    env.guard.activity(ActivityKind::KeyDown).unwrap();
    sleep(Duration::from_secs(50)).await;

    // 100 s since login, 50 s since the last key press.
    assert!(env.guard.snapshot().is_authenticated);
    assert!(env.presenter.reasons().is_empty());

    sleep(Duration::from_secs(11)).await;

    assert!(!env.guard.snapshot().is_authenticated);
    assert_eq!(env.presenter.reasons(), vec![LogoutReason::Inactivity]);
}

#[tokio::test(start_paused = true)]
async fn test_activity_updates_last_activity_timestamp() {
    let env = start(config(600, 3600));
    env.guard.login(creds()).await.unwrap();

    sleep(Duration::from_secs(30)).await;
    env.guard.activity(ActivityKind::Scroll).unwrap();
    // Let the guard process the queued event.
    sleep(Duration::from_millis(1)).await;

    assert_eq!(env.guard.snapshot().last_activity_ms, Some(EPOCH_MS + 30_000));
}

#[tokio::test(start_paused = true)]
async fn test_activity_event_non_qualifying_is_dropped() {
    let env = start(config(60, 3600));
    env.guard.login(creds()).await.unwrap();

    sleep(Duration::from_secs(50)).await;
    assert!(!env.guard.activity_event("mousemove").unwrap());
    assert!(env.guard.activity_event("wheel").unwrap());
    sleep(Duration::from_secs(50)).await;

    assert!(env.guard.snapshot().is_authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_activity_without_session_arms_nothing() {
    let env = start(config(60, 3600));

    env.guard.activity(ActivityKind::PointerDown).unwrap();
    sleep(Duration::from_secs(3 * 3600)).await;

    assert!(env.presenter.reasons().is_empty());
    assert_eq!(env.presenter.redirects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_huge_timeouts_are_capped_and_still_fire() {
    let env = start(config(u64::MAX, u64::MAX));

    let session = env.guard.login(creds()).await.unwrap();
    assert!(session.is_authenticated);
    assert!(env.guard.is_running());

    sleep(Duration::from_secs(MAX_DURATION_SECS + 1)).await;

    assert!(env.guard.is_running());
    assert!(!env.guard.snapshot().is_authenticated);
    assert_eq!(env.presenter.reasons(), vec![LogoutReason::Inactivity]);
}

// =========================================================================
// Revalidation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_revalidation_tick_expired_token_logs_out() {
    let env = start(GuardConfig {
        token_ttl_secs: 120,
        ..config(7200, 300)
    });
    env.guard.login(creds()).await.unwrap();

    // Keep the user active well past the token's expiry.
    for _ in 0..5 {
        sleep(Duration::from_secs(55)).await;
        env.guard.activity(ActivityKind::KeyDown).unwrap();
    }
    assert!(env.presenter.reasons().is_empty(), "no tick yet at 275 s");

    sleep(Duration::from_secs(30)).await;

    assert_eq!(env.presenter.reasons(), vec![LogoutReason::SessionExpired]);
    assert!(!env.guard.snapshot().is_authenticated);
    assert_eq!(
        env.backend.checks.load(Ordering::SeqCst),
        0,
        "an expired token is never sent to the backend"
    );
}

#[tokio::test(start_paused = true)]
async fn test_revalidation_backend_rejection_logs_out() {
    let env = start(config(7200, 300));
    env.guard.login(creds()).await.unwrap();
    env.backend.rejects_token.store(true, Ordering::SeqCst);

    sleep(Duration::from_secs(301)).await;

    assert_eq!(env.presenter.reasons(), vec![LogoutReason::SessionExpired]);
}

#[tokio::test(start_paused = true)]
async fn test_revalidation_backend_unreachable_fails_closed() {
    let env = start(config(7200, 300));
    env.guard.login(creds()).await.unwrap();
    env.backend.unreachable.store(true, Ordering::SeqCst);

    sleep(Duration::from_secs(301)).await;

    assert_eq!(env.presenter.reasons(), vec![LogoutReason::RevalidationFailed]);
    assert_eq!(env.guard.snapshot().state, SessionState::LoggedOut);
}

#[tokio::test(start_paused = true)]
async fn test_revalidation_valid_session_survives_ticks() {
    let env = start(config(7200, 300));
    env.guard.login(creds()).await.unwrap();

    sleep(Duration::from_secs(301 * 3)).await;

    assert_eq!(env.backend.checks.load(Ordering::SeqCst), 3);
    assert!(env.guard.snapshot().is_authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_revalidation_without_session_does_nothing() {
    let env = start(config(7200, 300));

    sleep(Duration::from_secs(301 * 2)).await;

    assert!(env.presenter.reasons().is_empty());
    assert_eq!(env.backend.checks.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_token_removed_by_other_tab_is_missing_credentials() {
    let env = start(config(7200, 300));
    env.guard.login(creds()).await.unwrap();
    seed_store(&env.storage).clear().unwrap();

    let transition = env.guard.check_now().await.unwrap();

    assert_eq!(
        transition,
        Transition::LoggedOut {
            reason: LogoutReason::MissingCredentials
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_simultaneous_triggers_show_one_notice() {
    // Inactivity deadline and first tick both land at 300 s.
    let env = start(config(300, 300));
    env.guard.login(creds()).await.unwrap();

    sleep(Duration::from_secs(301)).await;

    assert_eq!(env.presenter.reasons(), vec![LogoutReason::Inactivity]);
    assert_eq!(env.presenter.redirects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_commands_during_notice_are_ignored_after_it() {
    let env = start_with(
        config(7200, 3600),
        Arc::new(MemoryStorage::new()),
        RecordingPresenter::gated(),
    );
    env.guard.login(creds()).await.unwrap();
    env.backend.rejects_token.store(true, Ordering::SeqCst);
    let mut rx = env.guard.subscribe();

    let first = tokio::spawn({
        let guard = env.guard.clone();
        async move { guard.check_now().await }
    });
    rx.wait_for(|s| s.state == SessionState::ExpiringNotified)
        .await
        .unwrap();
    assert!(!env.guard.snapshot().is_authenticated);
    assert!(env.storage.is_empty(), "cleared before the notice resolves");

    let second = tokio::spawn({
        let guard = env.guard.clone();
        async move { guard.check_now().await }
    });
    tokio::task::yield_now().await;
    env.presenter.release.notify_one();

    assert_eq!(
        first.await.unwrap().unwrap(),
        Transition::LoggedOut {
            reason: LogoutReason::SessionExpired
        }
    );
    assert_eq!(second.await.unwrap().unwrap(), Transition::NoSession);
    assert_eq!(env.presenter.reasons().len(), 1);
    assert_eq!(env.presenter.redirects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activity_during_notice_never_blocks_caller() {
    let env = start_with(
        GuardConfig {
            command_buffer: 4,
            ..config(60, 3600)
        },
        Arc::new(MemoryStorage::new()),
        RecordingPresenter::gated(),
    );
    env.guard.login(creds()).await.unwrap();
    env.backend.rejects_token.store(true, Ordering::SeqCst);
    let mut rx = env.guard.subscribe();

    let check = tokio::spawn({
        let guard = env.guard.clone();
        async move { guard.check_now().await }
    });
    rx.wait_for(|s| s.state == SessionState::ExpiringNotified)
        .await
        .unwrap();

    // Far more events than the channel holds; none of them may wait.
    for _ in 0..200 {
        assert!(env.guard.activity_event("keydown").unwrap());
    }

    env.presenter.release.notify_one();
    assert_eq!(
        check.await.unwrap().unwrap(),
        Transition::LoggedOut {
            reason: LogoutReason::SessionExpired
        }
    );

    // The queued events find no session and arm nothing.
    sleep(Duration::from_secs(120)).await;
    assert!(env.guard.is_running());
    assert_eq!(env.guard.snapshot().state, SessionState::LoggedOut);
    assert_eq!(env.presenter.reasons(), vec![LogoutReason::SessionExpired]);
}

#[tokio::test(start_paused = true)]
async fn test_activity_after_teardown_is_guard_stopped() {
    let env = start(config(60, 3600));
    env.guard.teardown().await.unwrap();

    let err = env.guard.activity(ActivityKind::KeyDown).unwrap_err();
    assert!(matches!(err, FarmgateError::GuardStopped));
}

// =========================================================================
// Boot
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_boot_with_expired_token_notifies_and_clears() {
    let storage = Arc::new(MemoryStorage::new());
    // Written 61 s before the guard's epoch with a 60 s lifetime.
    let seed = TokenStore::new(
        Arc::clone(&storage),
        Arc::new(TokioClock::starting_at(EPOCH_MS - 61_000)),
    );
    seed.set("stale", Duration::from_secs(60)).unwrap();

    let env = start_with(config(7200, 300), storage, RecordingPresenter::default());
    let mut rx = env.guard.subscribe();
    // Boot runs in the guard task; a round trip guarantees it finished.
    env.guard.check_now().await.unwrap();

    assert_eq!(env.presenter.reasons(), vec![LogoutReason::SessionExpired]);
    assert!(seed.get().unwrap().is_empty());
    assert!(!rx.borrow_and_update().is_authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_boot_with_valid_token_restores_and_arms_timer() {
    let storage = Arc::new(MemoryStorage::new());
    seed_store(&storage)
        .set("live", Duration::from_secs(7200))
        .unwrap();

    let env = start_with(config(60, 3600), storage, RecordingPresenter::default());
    assert_eq!(env.guard.check_now().await.unwrap(), Transition::Unchanged);
    assert!(env.guard.snapshot().is_authenticated);

    sleep(Duration::from_secs(61)).await;

    assert_eq!(env.presenter.reasons(), vec![LogoutReason::Inactivity]);
}

// =========================================================================
// Login / logout / deletion
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_login_wrong_password_is_session_error() {
    let env = start(config(60, 3600));

    let err = env
        .guard
        .login(Credentials::new("grower", "nope"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FarmgateError::Session(SessionError::AuthFailed(_))
    ));
    assert!(!env.guard.snapshot().is_authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_logout_skips_notice_and_disarms_timer() {
    let env = start(config(60, 3600));
    env.guard.login(creds()).await.unwrap();
    seed_store(&env.storage)
        .set_user_item("grower", "recentCrops", "[]")
        .unwrap();

    let transition = env.guard.logout().await.unwrap();
    sleep(Duration::from_secs(120)).await;

    assert_eq!(
        transition,
        Transition::LoggedOut {
            reason: LogoutReason::UserRequested
        }
    );
    assert!(env.presenter.reasons().is_empty());
    assert_eq!(env.presenter.redirects(), 1);
    assert!(
        env.storage
            .keys()
            .unwrap()
            .iter()
            .all(|k| !k.starts_with(USER_KEY_PREFIX))
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_account_shows_deleted_notice() {
    let env = start(config(7200, 3600));
    env.guard.login(creds()).await.unwrap();

    let transition = env.guard.delete_account().await.unwrap();

    assert_eq!(
        transition,
        Transition::LoggedOut {
            reason: LogoutReason::AccountDeleted
        }
    );
    assert_eq!(env.presenter.reasons(), vec![LogoutReason::AccountDeleted]);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_mirrors_transitions() {
    let env = start(config(60, 3600));
    let mut rx = env.guard.subscribe();

    env.guard.login(creds()).await.unwrap();
    assert!(rx.borrow_and_update().is_authenticated);

    sleep(Duration::from_secs(61)).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().state, SessionState::LoggedOut);
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_timers_and_rejects_commands() {
    let env = start(config(60, 300));
    env.guard.login(creds()).await.unwrap();

    env.guard.teardown().await.unwrap();
    sleep(Duration::from_secs(3600)).await;

    assert!(!env.guard.is_running());
    assert!(env.presenter.reasons().is_empty());
    assert_eq!(env.backend.checks.load(Ordering::SeqCst), 0);
    assert!(matches!(
        env.guard.check_now().await,
        Err(FarmgateError::GuardStopped)
    ));
    // Teardown twice is fine.
    env.guard.teardown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_stops_guard() {
    let env = start(config(60, 300));
    let mut rx = env.guard.subscribe();
    let presenter = Arc::clone(&env.presenter);

    drop(env);

    // The controller (the only sender) goes away with the task, which
    // ends the stream of changes.
    while rx.changed().await.is_ok() {}
    assert!(rx.has_changed().is_err());
    assert_eq!(presenter.redirects(), 0);
}
