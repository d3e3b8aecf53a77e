//! The activity monitor: both timers behind one event source.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{
    ActivityKind, InactivityTimer, RevalidationTicker, TickInfo, TickerConfig,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for [`ActivityMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Maximum gap between qualifying actions before a forced logout.
    /// Default: 2 hours.
    pub inactivity_timeout: Duration,
    /// Revalidation ticker settings.
    pub ticker: TickerConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(2 * 60 * 60),
            ticker: TickerConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// Something the session controller has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// No qualifying activity for a whole inactivity timeout.
    InactivityExpired { deadline: Instant },
    /// The periodic login-status check is due.
    RevalidationDue(TickInfo),
}

/// What [`ActivityMonitor::on_activity`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// A session is active; the inactivity deadline moved to `deadline`.
    Restarted { deadline: Instant },
    /// No session (or the monitor is shut down); nothing to protect.
    Ignored,
}

/// Counters for observability and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorMetrics {
    pub activity_events: u64,
    pub ignored_events: u64,
    pub timer_restarts: u64,
    pub revalidation_ticks: u64,
    pub inactivity_expirations: u64,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Watches user liveness for one guard.
///
/// Owned by a single task (the guard actor). Nothing in here is shared, so
/// the "one live inactivity timer per session" rule holds by construction:
/// there is only one timer slot.
#[derive(Debug)]
pub struct ActivityMonitor {
    timer: InactivityTimer,
    ticker: RevalidationTicker,
    metrics: MonitorMetrics,
    shut_down: bool,
}

impl ActivityMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            timer: InactivityTimer::new(config.inactivity_timeout),
            ticker: RevalidationTicker::new(config.ticker),
            metrics: MonitorMetrics::default(),
            shut_down: false,
        }
    }

    /// A session has just been established (login or restored at boot):
    /// start the inactivity countdown.
    pub fn start_session(&mut self) -> Option<Instant> {
        if self.shut_down {
            return None;
        }
        Some(self.timer.arm())
    }

    /// The session is gone: cancel the inactivity countdown.
    pub fn end_session(&mut self) {
        self.timer.disarm();
    }

    /// Handles one input event.
    ///
    /// `session_active` comes from the session controller; without a
    /// session there is no timer to push forward.
    pub fn on_activity(
        &mut self,
        kind: ActivityKind,
        session_active: bool,
    ) -> ActivityOutcome {
        self.metrics.activity_events += 1;

        if self.shut_down || !session_active {
            self.metrics.ignored_events += 1;
            trace!(%kind, "activity ignored (no session)");
            return ActivityOutcome::Ignored;
        }

        let deadline = self.timer.restart();
        self.metrics.timer_restarts += 1;
        trace!(%kind, "activity recorded");
        ActivityOutcome::Restarted { deadline }
    }

    /// Waits for the next timer event.
    ///
    /// If both are due at once the inactivity expiry wins: it leads to a
    /// logout anyway, and a revalidation tick against a session that is
    /// about to end would be wasted work.
    ///
    /// Cancel-safe, like the underlying timers.
    pub async fn next_event(&mut self) -> MonitorEvent {
        tokio::select! {
            biased;
            deadline = self.timer.wait_for_expiry() => {
                self.metrics.inactivity_expirations += 1;
                MonitorEvent::InactivityExpired { deadline }
            }
            info = self.ticker.wait_for_tick() => {
                self.metrics.revalidation_ticks += 1;
                MonitorEvent::RevalidationDue(info)
            }
        }
    }

    /// Cancels both timers for good (application teardown).
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.timer.disarm();
        self.ticker.stop();
        debug!(metrics = ?self.metrics, "activity monitor shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn timer(&self) -> &InactivityTimer {
        &self.timer
    }

    pub fn ticker(&self) -> &RevalidationTicker {
        &self.ticker
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
