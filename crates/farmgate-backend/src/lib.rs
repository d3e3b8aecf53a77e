//! HTTP implementation of the farmgate auth backend.
//!
//! [`HttpBackend`] speaks the portal's REST API:
//!
//! | call                | request                          | success            |
//! |---------------------|----------------------------------|--------------------|
//! | login               | `POST /auth/login` (JSON)        | `{success, token}` |
//! | session check       | `GET /auth/status` (bearer)      | `{valid}`          |
//! | account deletion    | `DELETE /users/me` (bearer)      | any 2xx            |
//!
//! A 401 or 403 from the status endpoint means the token is no longer
//! accepted. Every other failure is an error, which the session controller
//! treats as a failed revalidation.

mod config;
mod error;
mod http;

pub use config::{BackendConfig, DEFAULT_TIMEOUT};
pub use error::BackendError;
pub use http::{HttpBackend, TRACING_TARGET};
