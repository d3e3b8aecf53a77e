//! Fixed-period revalidation ticker.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the revalidation ticker.
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// Time between revalidation ticks. Default: 5 minutes.
    pub period: Duration,
    /// Random jitter (0..max) added to the *first* tick only, so several
    /// clients sharing one storage file don't all revalidate in lockstep.
    /// Default: 2 seconds.
    pub initial_jitter: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5 * 60),
            initial_jitter: Duration::from_secs(2),
        }
    }
}

impl TickerConfig {
    /// Shortest period the ticker accepts.
    pub const MIN_PERIOD: Duration = Duration::from_secs(1);
    /// Longest period the ticker accepts: 30 days.
    pub const MAX_PERIOD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// A config with the given period and no jitter.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            initial_jitter: Duration::ZERO,
        }
    }

    /// Clamps out-of-range values. Called by [`RevalidationTicker::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_millis() as u64,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "revalidation period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        if self.period > Self::MAX_PERIOD {
            warn!(
                period_secs = self.period.as_secs(),
                max_secs = Self::MAX_PERIOD.as_secs(),
                "revalidation period above maximum, clamping"
            );
            self.period = Self::MAX_PERIOD;
        }
        if self.initial_jitter > self.period {
            warn!(
                jitter_ms = self.initial_jitter.as_millis() as u64,
                "initial jitter longer than the period, clamping"
            );
            self.initial_jitter = self.period;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by
/// [`RevalidationTicker::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if the tick fired noticeably late (the loop was busy, e.g.
    /// a notice was waiting for the user).
    pub overrun: bool,
    /// Whole periods that were skipped because of the overrun.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Repeating timer that drives the periodic login-status check.
///
/// Missed ticks are never replayed: when the ticker wakes late, it fires
/// once and schedules the next tick a full period from now.
#[derive(Debug)]
pub struct RevalidationTicker {
    config: TickerConfig,
    tick_count: u64,
    next_tick: Instant,
    stopped: bool,
}

impl RevalidationTicker {
    pub fn new(config: TickerConfig) -> Self {
        let config = config.validated();

        let jitter_ms = config.initial_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..jitter_ms))
        } else {
            Duration::ZERO
        };
        let next_tick = Instant::now() + config.period + jitter;

        debug!(
            period_secs = config.period.as_secs(),
            jitter_ms = jitter.as_millis() as u64,
            "revalidation ticker created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
            stopped: false,
        }
    }

    /// A ticker with the given period and no jitter.
    pub fn with_period(period: Duration) -> Self {
        Self::new(TickerConfig::with_period(period))
    }

    /// Waits until the next tick is due.
    ///
    /// After [`stop`](Self::stop) this future pends forever.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.stopped {
            std::future::pending::<()>().await;
            unreachable!()
        }

        let scheduled = self.next_tick;
        time::sleep_until(scheduled).await;

        let now = Instant::now();
        let period = self.config.period;
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(scheduled);
        let overrun = late_by > period / 10;
        let ticks_skipped = if overrun {
            late_by.as_nanos() as u64 / period.as_nanos() as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_millis() as u64,
                "revalidation tick late, skipping ahead"
            );
        }

        // Always schedule from now, not from the missed deadline.
        self.next_tick = now + period;

        trace!(tick = self.tick_count, overrun, "revalidation tick");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Stops the ticker for good. Idempotent.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            debug!(ticks = self.tick_count, "revalidation ticker stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    /// When the next tick is scheduled (meaningless once stopped).
    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }
}
