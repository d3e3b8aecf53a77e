//! Tracing setup for binaries.
//!
//! Libraries in this workspace only emit `tracing` events; installing a
//! subscriber is the host's call. Hosts that don't have their own can use
//! [`init`].

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when `RUST_LOG` is unset.
///
/// ```bash
/// RUST_LOG=farmgate=debug,farmgate_session=debug portal-console
/// ```
///
/// Returns `false` if a global subscriber was already installed (the call
/// is then a no-op), so tests and hosts can call it unconditionally.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}
