//! Session lifecycle for the farmgate guard.
//!
//! This crate holds the single authority over "is the user logged in":
//!
//! 1. **Backend seam**: the [`AuthBackend`] trait: log in, check that a
//!    token is still accepted, delete the account.
//! 2. **UI seam**: the [`Presenter`] trait: show a blocking [`Notice`],
//!    redirect to the login view.
//! 3. **State machine**: [`SessionController`], the only code allowed to
//!    write the token store or flip `is_authenticated`.
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard runtime (above)   ← feeds activity, ticks and user commands in
//!     ↕
//! Session layer (this crate) ← decides every state transition
//!     ↕
//! Token store (below)     ← persists token + expiry
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod controller;
mod error;
mod presenter;
mod session;

pub use auth::{AuthBackend, Credentials, LoginGrant};
pub use controller::{BootOutcome, SessionController, Transition};
pub use error::SessionError;
pub use presenter::{Notice, Presenter};
pub use session::{LogoutReason, Session, SessionConfig, SessionState};
