//! Guard configuration.
//!
//! Everything has a sensible default, so an empty JSON object (`{}`) is a
//! valid config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use farmgate_backend::BackendConfig;
use farmgate_monitor::{MonitorConfig, TickerConfig};
use farmgate_session::SessionConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::FarmgateError;

/// Default inactivity timeout: 2 hours.
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 2 * 60 * 60;
/// Default revalidation interval: 5 minutes.
pub const DEFAULT_REVALIDATION_INTERVAL_SECS: u64 = 5 * 60;
/// Default token lifetime when the backend doesn't send one: 2 hours.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 2 * 60 * 60;
/// Upper bound for every duration setting: 30 days.
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration for a session guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Maximum gap between qualifying actions before a forced logout.
    pub inactivity_timeout_secs: u64,

    /// Time between login-status checks.
    pub revalidation_interval_secs: u64,

    /// Token lifetime used when the backend doesn't send one.
    pub token_ttl_secs: u64,

    /// Upper bound of the random delay before the first check.
    pub revalidation_jitter_ms: u64,

    /// Capacity of the guard's command channel. When full, requests wait
    /// and activity reports are dropped.
    pub command_buffer: usize,

    /// Token file. `None` means the host supplies its own storage.
    pub storage_path: Option<PathBuf>,

    /// Portal API. `None` means the host supplies its own backend.
    pub backend: Option<BackendConfig>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
            revalidation_interval_secs: DEFAULT_REVALIDATION_INTERVAL_SECS,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            revalidation_jitter_ms: 2_000,
            command_buffer: 64,
            storage_path: None,
            backend: None,
        }
    }
}

impl GuardConfig {
    /// Parses a config from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, FarmgateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FarmgateError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Replaces zero values with their defaults and caps durations at
    /// [`MAX_DURATION_SECS`].
    pub fn validated(mut self) -> Self {
        if self.inactivity_timeout_secs == 0 {
            warn!(
                default = DEFAULT_INACTIVITY_TIMEOUT_SECS,
                "inactivity_timeout_secs is 0, using default"
            );
            self.inactivity_timeout_secs = DEFAULT_INACTIVITY_TIMEOUT_SECS;
        }
        if self.revalidation_interval_secs == 0 {
            warn!(
                default = DEFAULT_REVALIDATION_INTERVAL_SECS,
                "revalidation_interval_secs is 0, using default"
            );
            self.revalidation_interval_secs = DEFAULT_REVALIDATION_INTERVAL_SECS;
        }
        if self.token_ttl_secs == 0 {
            warn!(
                default = DEFAULT_TOKEN_TTL_SECS,
                "token_ttl_secs is 0, using default"
            );
            self.token_ttl_secs = DEFAULT_TOKEN_TTL_SECS;
        }
        for (name, secs) in [
            ("inactivity_timeout_secs", &mut self.inactivity_timeout_secs),
            ("revalidation_interval_secs", &mut self.revalidation_interval_secs),
            ("token_ttl_secs", &mut self.token_ttl_secs),
        ] {
            if *secs > MAX_DURATION_SECS {
                warn!(setting = name, max = MAX_DURATION_SECS, "duration too long, clamping");
                *secs = MAX_DURATION_SECS;
            }
        }
        if self.revalidation_jitter_ms > MAX_DURATION_SECS * 1_000 {
            warn!(max_ms = MAX_DURATION_SECS * 1_000, "revalidation_jitter_ms too long, clamping");
            self.revalidation_jitter_ms = MAX_DURATION_SECS * 1_000;
        }
        if self.command_buffer == 0 {
            warn!("command_buffer is 0, using 1");
            self.command_buffer = 1;
        }
        self
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn revalidation_interval(&self) -> Duration {
        Duration::from_secs(self.revalidation_interval_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            inactivity_timeout: self.inactivity_timeout(),
            ticker: TickerConfig {
                period: self.revalidation_interval(),
                initial_jitter: Duration::from_millis(self.revalidation_jitter_ms),
            },
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            token_ttl: self.token_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_str_empty_object_gives_defaults() {
        let config = GuardConfig::from_json_str("{}").unwrap();
        assert_eq!(config, GuardConfig::default());
    }

    #[test]
    fn test_from_json_str_overrides_and_nested_backend() {
        let json = r#"{
            "inactivity_timeout_secs": 900,
            "storage_path": "/tmp/farmgate.json",
            "backend": { "base_url": "https://portal.example/api" }
        }"#;

        let config = GuardConfig::from_json_str(json).unwrap();

        assert_eq!(config.inactivity_timeout(), Duration::from_secs(900));
        assert_eq!(config.revalidation_interval_secs, 300);
        assert_eq!(
            config.storage_path.as_deref(),
            Some(Path::new("/tmp/farmgate.json"))
        );
        let backend = config.backend.expect("backend section");
        assert_eq!(backend.base_url, "https://portal.example/api");
        assert_eq!(backend.status_path, "/auth/status");
    }

    #[test]
    fn test_from_json_str_invalid_json_is_parse_error() {
        let err = GuardConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, FarmgateError::ConfigParse(_)));
    }

    #[test]
    fn test_from_json_file_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GuardConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, FarmgateError::ConfigIo(_)));
    }

    #[test]
    fn test_validated_zero_values_use_defaults() {
        let config = GuardConfig {
            inactivity_timeout_secs: 0,
            revalidation_interval_secs: 0,
            token_ttl_secs: 0,
            command_buffer: 0,
            ..GuardConfig::default()
        }
        .validated();

        assert_eq!(config.inactivity_timeout_secs, 7200);
        assert_eq!(config.revalidation_interval_secs, 300);
        assert_eq!(config.token_ttl_secs, 7200);
        assert_eq!(config.command_buffer, 1);
    }

    #[test]
    fn test_validated_huge_durations_are_capped() {
        let config = GuardConfig {
            inactivity_timeout_secs: u64::MAX,
            revalidation_interval_secs: u64::MAX,
            token_ttl_secs: u64::MAX,
            revalidation_jitter_ms: u64::MAX,
            ..GuardConfig::default()
        }
        .validated();

        assert_eq!(config.inactivity_timeout_secs, MAX_DURATION_SECS);
        assert_eq!(config.revalidation_interval_secs, MAX_DURATION_SECS);
        assert_eq!(config.token_ttl_secs, MAX_DURATION_SECS);
        assert_eq!(config.revalidation_jitter_ms, MAX_DURATION_SECS * 1_000);
    }

    #[test]
    fn test_monitor_config_carries_timeout_and_jitter() {
        let config = GuardConfig {
            inactivity_timeout_secs: 60,
            revalidation_jitter_ms: 0,
            ..GuardConfig::default()
        };

        let monitor = config.monitor_config();

        assert_eq!(monitor.inactivity_timeout, Duration::from_secs(60));
        assert_eq!(monitor.ticker.period, Duration::from_secs(300));
        assert_eq!(monitor.ticker.initial_jitter, Duration::ZERO);
    }
}
