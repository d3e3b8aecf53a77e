//! The UI seam: blocking notices and the login redirect.

use std::future::Future;
use std::sync::Arc;

use crate::LogoutReason;

/// A modal message shown before a forced logout completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub reason: LogoutReason,
    pub title: String,
    pub message: String,
}

/// Whatever draws the application: a browser shell, a TUI, a test spy.
pub trait Presenter: Send + Sync + 'static {
    /// Shows `notice` and resolves once the user has acknowledged it.
    ///
    /// The controller awaits this before redirecting, so the user never
    /// lands on the login view without knowing why.
    fn show_notice(&self, notice: &Notice) -> impl Future<Output = ()> + Send;

    /// Navigates to the login view. Always the last step of a logout.
    fn redirect_to_login(&self);
}

impl<P: Presenter> Presenter for Arc<P> {
    fn show_notice(&self, notice: &Notice) -> impl Future<Output = ()> + Send {
        (**self).show_notice(notice)
    }

    fn redirect_to_login(&self) {
        (**self).redirect_to_login()
    }
}
