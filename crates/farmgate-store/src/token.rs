//! The token store: `token` + expiry, plus per-user cache keys.

use std::sync::Arc;
use std::time::Duration;

use crate::{Clock, Storage, StoreError, SystemClock};

/// Key holding the opaque bearer token.
pub const TOKEN_KEY: &str = "token";

/// Key holding the token's expiry, as an epoch-millis string.
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";

/// Older clients wrote the expiry under this key. It's written alongside
/// [`TOKEN_EXPIRY_KEY`] and read as a fallback.
pub const LEGACY_EXPIRY_KEY: &str = "loginExpireTime";

/// Key holding the logged-in user's identifier.
pub const USER_ID_KEY: &str = "userId";

/// Prefix of every per-user cached key (`user:<id>:<name>`).
pub const USER_KEY_PREFIX: &str = "user:";

/// Builds the storage key for a per-user cached item, e.g. the list of
/// crop guides a user viewed recently.
pub fn user_key(user_id: &str, name: &str) -> String {
    format!("{USER_KEY_PREFIX}{user_id}:{name}")
}

/// What [`TokenStore::get`] found in storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredToken {
    pub token: Option<String>,
    pub expires_at_ms: Option<u64>,
}

impl StoredToken {
    /// Both fields absent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.expires_at_ms.is_none()
    }

    /// `true` unless the expiry is strictly in the future.
    ///
    /// A token without a readable expiry counts as expired.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at_ms {
            Some(at) => at <= now_ms,
            None => true,
        }
    }
}

/// Durable persistence for the session token.
///
/// Holds no state of its own beyond the storage handle and a clock: every
/// call reads or writes storage directly.
pub struct TokenStore<S: Storage> {
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S: Storage> TokenStore<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// A store that reads the real wall clock.
    pub fn with_system_clock(storage: S) -> Self {
        Self::new(storage, Arc::new(SystemClock))
    }

    /// Current time according to this store's clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Stores `token` with an expiry of `now + ttl`. Returns the expiry.
    ///
    /// # Errors
    /// Any [`StoreError`] from the backing storage. The caller must treat
    /// this as "cannot stay logged in".
    pub fn set(&self, token: &str, ttl: Duration) -> Result<u64, StoreError> {
        let expires_at = self
            .now_millis()
            .saturating_add(ttl.as_millis() as u64);
        let expiry = expires_at.to_string();

        self.storage.set_item(TOKEN_KEY, token)?;
        self.storage.set_item(TOKEN_EXPIRY_KEY, &expiry)?;
        self.storage.set_item(LEGACY_EXPIRY_KEY, &expiry)?;

        tracing::debug!(expires_at, "token stored");
        Ok(expires_at)
    }

    /// Reads the token and its expiry. Both absent if never set or cleared.
    ///
    /// An expiry that isn't a number is reported as absent.
    pub fn get(&self) -> Result<StoredToken, StoreError> {
        let token = self.storage.get_item(TOKEN_KEY)?;
        let raw_expiry = match self.storage.get_item(TOKEN_EXPIRY_KEY)? {
            Some(raw) => Some(raw),
            None => self.storage.get_item(LEGACY_EXPIRY_KEY)?,
        };

        let expires_at_ms = raw_expiry.and_then(|raw| match raw.parse() {
            Ok(ms) => Some(ms),
            Err(_) => {
                tracing::warn!(%raw, "ignoring unparseable token expiry");
                None
            }
        });

        Ok(StoredToken {
            token,
            expires_at_ms,
        })
    }

    /// Removes the token, its expiry, the user id and every per-user cached
    /// key. Idempotent.
    pub fn clear(&self) -> Result<(), StoreError> {
        for key in [TOKEN_KEY, TOKEN_EXPIRY_KEY, LEGACY_EXPIRY_KEY, USER_ID_KEY]
        {
            self.storage.remove_item(key)?;
        }

        let mut removed = 0usize;
        for key in self.storage.keys()? {
            if key.starts_with(USER_KEY_PREFIX) {
                self.storage.remove_item(&key)?;
                removed += 1;
            }
        }

        tracing::debug!(user_keys_removed = removed, "token store cleared");
        Ok(())
    }

    pub fn set_user_id(&self, user_id: &str) -> Result<(), StoreError> {
        self.storage.set_item(USER_ID_KEY, user_id)
    }

    pub fn user_id(&self) -> Result<Option<String>, StoreError> {
        self.storage.get_item(USER_ID_KEY)
    }

    /// Stores a per-user cached item under `user:<user_id>:<name>`.
    pub fn set_user_item(
        &self,
        user_id: &str,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.storage.set_item(&user_key(user_id, name), value)
    }

    pub fn user_item(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError> {
        self.storage.get_item(&user_key(user_id, name))
    }
}
