//! The inactivity timer: one resettable single-shot deadline.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// A single-shot countdown restarted on every qualifying activity.
///
/// There is exactly one deadline slot, so restarting *is* cancelling: the
/// old deadline is overwritten and can never fire. The deadline is always
/// `last restart + timeout`.
#[derive(Debug)]
pub struct InactivityTimer {
    timeout: Duration,
    deadline: Option<Instant>,
    last_restart: Option<Instant>,
    restarts: u64,
}

impl InactivityTimer {
    /// Longest timeout the timer accepts: 30 days.
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    pub fn new(timeout: Duration) -> Self {
        let timeout = if timeout > Self::MAX_TIMEOUT {
            warn!(
                timeout_secs = timeout.as_secs(),
                max_secs = Self::MAX_TIMEOUT.as_secs(),
                "inactivity timeout above maximum, clamping"
            );
            Self::MAX_TIMEOUT
        } else {
            timeout
        };
        Self {
            timeout,
            deadline: None,
            last_restart: None,
            restarts: 0,
        }
    }

    /// Starts the countdown for a freshly established session.
    pub fn arm(&mut self) -> Instant {
        let deadline = self.reset_from_now();
        debug!(
            timeout_secs = self.timeout.as_secs(),
            "inactivity timer armed"
        );
        deadline
    }

    /// Cancels the pending deadline and starts a new one from now.
    pub fn restart(&mut self) -> Instant {
        let deadline = self.reset_from_now();
        trace!(restarts = self.restarts, "inactivity timer restarted");
        deadline
    }

    /// Cancels the countdown. Returns `true` if a deadline was pending.
    pub fn disarm(&mut self) -> bool {
        let was_armed = self.deadline.take().is_some();
        if was_armed {
            debug!("inactivity timer disarmed");
        }
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// When the countdown was last (re)started.
    pub fn last_restart(&self) -> Option<Instant> {
        self.last_restart
    }

    /// Time left before the deadline, or `None` while disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Total number of arms and restarts since creation.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Waits for the current deadline and returns it. The timer is
    /// disarmed once it fires.
    ///
    /// While disarmed this future pends forever. It is cancel-safe: if a
    /// `select!` drops it before the deadline, nothing changes.
    pub async fn wait_for_expiry(&mut self) -> Instant {
        let Some(deadline) = self.deadline else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(deadline).await;

        self.deadline = None;
        debug!("inactivity timer fired");
        deadline
    }

    fn reset_from_now(&mut self) -> Instant {
        let now = Instant::now();
        let deadline = now + self.timeout;
        self.deadline = Some(deadline);
        self.last_restart = Some(now);
        self.restarts += 1;
        deadline
    }
}
