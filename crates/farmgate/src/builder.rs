//! `Farmgate` builder: ties storage, backend and presenter into a running
//! session guard.

use std::sync::Arc;

use farmgate_backend::HttpBackend;
use farmgate_monitor::ActivityMonitor;
use farmgate_session::{AuthBackend, Presenter, SessionController};
use farmgate_store::{Clock, FileStorage, Storage, SystemClock, TokenStore};
use tracing::info;

use crate::{FarmgateError, GuardConfig, GuardHandle, guard::spawn_guard};

/// Entry point.
///
/// # Example
///
/// ```rust,ignore
/// use farmgate::prelude::*;
///
/// let guard = Farmgate::builder()
///     .config(GuardConfig::from_json_file("farmgate.json")?)
///     .start(storage, backend, presenter)?;
///
/// guard.activity_event("keydown")?;
/// ```
pub struct Farmgate;

impl Farmgate {
    pub fn builder() -> FarmgateBuilder {
        FarmgateBuilder::new()
    }
}

/// Builder for configuring and starting a session guard.
pub struct FarmgateBuilder {
    config: GuardConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl FarmgateBuilder {
    /// Creates a builder with the default config and the system clock.
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
            clock: None,
        }
    }

    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the wall clock used for token expiry. Tests pass a
    /// `TokioClock` so expiry follows paused time.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Spawns the guard with the given parts and returns its handle.
    ///
    /// Must be called inside a Tokio runtime. The boot check runs in the
    /// guard task; commands sent right away queue behind it.
    pub fn start<S, B, P>(
        self,
        storage: S,
        backend: B,
        presenter: P,
    ) -> Result<GuardHandle, FarmgateError>
    where
        S: Storage,
        B: AuthBackend,
        P: Presenter,
    {
        let config = self.config.validated();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let store = TokenStore::new(storage, clock);
        let controller =
            SessionController::new(store, backend, presenter, config.session_config());
        let monitor = ActivityMonitor::new(config.monitor_config());

        info!(
            inactivity_timeout_secs = config.inactivity_timeout_secs,
            revalidation_interval_secs = config.revalidation_interval_secs,
            "starting session guard"
        );
        Ok(spawn_guard(controller, monitor, config.command_buffer))
    }

    /// Starts a guard backed by the configured token file and portal API.
    ///
    /// # Errors
    /// - [`FarmgateError::InvalidConfig`] if `storage_path` or `backend`
    ///   is missing
    /// - store / backend errors from opening either
    pub fn start_http<P: Presenter>(self, presenter: P) -> Result<GuardHandle, FarmgateError> {
        let path = self.config.storage_path.clone().ok_or_else(|| {
            FarmgateError::InvalidConfig("storage_path is required".into())
        })?;
        let backend_config = self
            .config
            .backend
            .clone()
            .ok_or_else(|| FarmgateError::InvalidConfig("backend is required".into()))?;

        let storage = FileStorage::open(path)?;
        let backend = HttpBackend::new(backend_config)?;
        self.start(storage, backend, presenter)
    }
}

impl Default for FarmgateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
