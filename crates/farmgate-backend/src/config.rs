//! Configuration for the HTTP backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::BackendError;

/// Default timeout for a single request: 10 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the portal's auth API lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Scheme, host and optional prefix, e.g. `https://portal.example/api`.
    pub base_url: String,
    pub login_path: String,
    pub status_path: String,
    pub account_path: String,
    /// Per-request timeout, stored as whole seconds in config files.
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            login_path: "/auth/login".to_string(),
            status_path: "/auth/status".to_string(),
            account_path: "/users/me".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("farmgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Checks that a client built from this config can work at all.
    pub fn validate(&self) -> Result<(), BackendError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(BackendError::InvalidConfig(format!(
                "base_url must be http(s), got {:?}",
                self.base_url
            )));
        }
        for (name, path) in [
            ("login_path", &self.login_path),
            ("status_path", &self.status_path),
            ("account_path", &self.account_path),
        ] {
            if !path.starts_with('/') {
                return Err(BackendError::InvalidConfig(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }
        if self.timeout.is_zero() {
            return Err(BackendError::InvalidConfig("timeout must be non-zero".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(BackendError::InvalidConfig("user_agent is empty".into()));
        }
        Ok(())
    }

    /// Joins `path` onto the base URL. A trailing slash on the base is
    /// dropped so the result never contains `//`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn login_url(&self) -> String {
        self.endpoint(&self.login_path)
    }

    pub fn status_url(&self) -> String {
        self.endpoint(&self.status_path)
    }

    pub fn account_url(&self) -> String {
        self.endpoint(&self.account_path)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BackendConfig::default().validate().is_ok());
    }

    #[test]
    fn test_endpoint_trailing_slash_not_doubled() {
        let config = BackendConfig::new("https://portal.example/api/");

        assert_eq!(config.login_url(), "https://portal.example/api/auth/login");
        assert_eq!(config.account_url(), "https://portal.example/api/users/me");
    }

    #[test]
    fn test_validate_rejects_non_http_base() {
        let config = BackendConfig::new("ftp://portal.example");
        assert!(matches!(config.validate(), Err(BackendError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        let config = BackendConfig {
            status_path: "auth/status".into(),
            ..BackendConfig::default()
        };
        assert!(matches!(config.validate(), Err(BackendError::InvalidConfig(m)) if m.contains("status_path")));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = BackendConfig::default().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json_fills_defaults() {
        let config: BackendConfig =
            serde_json::from_str(r#"{ "base_url": "https://x.test", "timeout_secs": 3 }"#).unwrap();

        assert_eq!(config.base_url, "https://x.test");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.login_path, "/auth/login");
    }
}
