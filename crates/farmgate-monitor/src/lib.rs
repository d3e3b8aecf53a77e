//! User-liveness monitoring for the farmgate session guard.
//!
//! Two clocks run side by side:
//!
//! - the **inactivity timer** ([`InactivityTimer`]): a single-shot
//!   deadline pushed forward on every qualifying input event while a
//!   session is active. When it fires, the user walked away.
//! - the **revalidation ticker** ([`RevalidationTicker`]): a fixed-period
//!   tick (5 minutes by default) that lives as long as the guard does,
//!   independent of user activity.
//!
//! [`ActivityMonitor`] owns both and turns them into a single stream of
//! [`MonitorEvent`]s.
//!
//! # Integration
//!
//! The monitor is designed to sit inside the guard actor's `tokio::select!`
//! loop, next to the command channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* login, logout, activity, ... */ }
//!         event = monitor.next_event() => match event {
//!             MonitorEvent::InactivityExpired { .. } => { /* forced logout */ }
//!             MonitorEvent::RevalidationDue(info) => { /* check status */ }
//!         }
//!     }
//! }
//! ```
//!
//! Both timers pend forever while they have nothing to do (no session, or
//! after [`ActivityMonitor::shutdown`]), so the select loop simply keeps
//! serving commands.

mod activity;
mod monitor;
mod ticker;
mod timer;

pub use activity::ActivityKind;
pub use monitor::{
    ActivityMonitor, ActivityOutcome, MonitorConfig, MonitorEvent,
    MonitorMetrics,
};
pub use ticker::{RevalidationTicker, TickInfo, TickerConfig};
pub use timer::InactivityTimer;
