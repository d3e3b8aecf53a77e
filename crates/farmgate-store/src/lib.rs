//! Token storage for the farmgate session guard.
//!
//! This crate is the bottom layer of the guard. It knows how to keep a
//! bearer token and its expiry alive across restarts, nothing more:
//!
//! - **Storage** ([`Storage`] trait, [`FileStorage`], [`MemoryStorage`]):
//!   a small string key-value store with the same shape as browser local
//!   storage.
//! - **Token store** ([`TokenStore`]): the `token` / `tokenExpiry` pair
//!   plus the per-user cache keys that must disappear on logout.
//! - **Clocks** ([`Clock`], [`SystemClock`], [`TokioClock`],
//!   [`ManualClock`]): where "now" comes from, in epoch milliseconds.
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard runtime (farmgate)            ← owns everything, runs the actor
//!     ↕
//! Session controller (farmgate-session) ← the only writer of the token store
//!     ↕
//! Token store (this crate)            ← durable key-value persistence
//! ```

mod clock;
mod error;
mod storage;
mod token;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use error::StoreError;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use token::{
    LEGACY_EXPIRY_KEY, StoredToken, TOKEN_EXPIRY_KEY, TOKEN_KEY, TokenStore,
    USER_ID_KEY, USER_KEY_PREFIX, user_key,
};
