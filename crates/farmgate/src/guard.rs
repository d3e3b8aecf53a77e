//! Session guard actor: one Tokio task that owns the session controller and
//! the activity monitor.
//!
//! The outside world talks to it through a [`GuardHandle`], which wraps an
//! mpsc channel. Requests that need an answer carry a `oneshot` reply
//! channel. Because the actor handles one command or timer event at a
//! time, no two session transitions can ever run concurrently, and a
//! trigger that arrives while a logout notice is on screen simply waits
//! and then finds the session already gone.

use farmgate_monitor::{ActivityKind, ActivityMonitor, ActivityOutcome, MonitorEvent};
use farmgate_session::{
    AuthBackend, Credentials, LogoutReason, Presenter, Session,
    SessionController, SessionError, Transition,
};
use farmgate_store::Storage;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::FarmgateError;

/// Commands sent to the guard actor through its channel.
pub(crate) enum GuardCommand {
    /// A qualifying user action (fire-and-forget).
    Activity { kind: ActivityKind },

    Login {
        credentials: Credentials,
        reply: oneshot::Sender<Result<Session, SessionError>>,
    },

    Logout {
        reply: oneshot::Sender<Transition>,
    },

    DeleteAccount {
        reply: oneshot::Sender<Result<Transition, SessionError>>,
    },

    /// Run the revalidation check now instead of waiting for the ticker.
    CheckNow {
        reply: oneshot::Sender<Transition>,
    },

    /// Stop both timers and end the task.
    Teardown { reply: oneshot::Sender<()> },
}

// ---------------------------------------------------------------------------
// GuardHandle
// ---------------------------------------------------------------------------

/// Handle to a running session guard.
///
/// Cheap to clone: an `mpsc::Sender` plus a `watch::Receiver`. The guard
/// stops on [`teardown`](Self::teardown) or once every handle is dropped.
#[derive(Clone)]
pub struct GuardHandle {
    sender: mpsc::Sender<GuardCommand>,
    session: watch::Receiver<Session>,
}

impl GuardHandle {
    /// Reports a qualifying user action without waiting.
    ///
    /// The inactivity deadline moves when the guard processes it. If the
    /// command channel is full (the guard is busy, e.g. a logout notice is
    /// on screen) the event is dropped: queued activity already restarts
    /// the timer, and after a forced logout there is no timer to restart.
    pub fn activity(&self, kind: ActivityKind) -> Result<(), FarmgateError> {
        match self.sender.try_send(GuardCommand::Activity { kind }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                trace!(%kind, "guard busy, activity dropped");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(FarmgateError::GuardStopped),
        }
    }

    /// Reports a raw DOM-style event name (`"keydown"`, `"wheel"`, ...).
    ///
    /// Returns `Ok(false)` for events that don't count as activity
    /// (`mousemove`, `focus`...); those are dropped here.
    pub fn activity_event(&self, event_name: &str) -> Result<bool, FarmgateError> {
        match ActivityKind::from_event_name(event_name) {
            Some(kind) => {
                self.activity(kind)?;
                Ok(true)
            }
            None => {
                trace!(event_name, "non-qualifying event dropped");
                Ok(false)
            }
        }
    }

    /// Logs in. Errors from the backend or the token store come back as
    /// [`FarmgateError::Session`].
    pub async fn login(&self, credentials: Credentials) -> Result<Session, FarmgateError> {
        let (reply, rx) = oneshot::channel();
        self.request(GuardCommand::Login { credentials, reply }, rx)
            .await?
            .map_err(FarmgateError::from)
    }

    /// Explicit logout. [`Transition::Ignored`] if nobody was logged in.
    pub async fn logout(&self) -> Result<Transition, FarmgateError> {
        let (reply, rx) = oneshot::channel();
        self.request(GuardCommand::Logout { reply }, rx).await
    }

    /// Deletes the account and ends the session.
    pub async fn delete_account(&self) -> Result<Transition, FarmgateError> {
        let (reply, rx) = oneshot::channel();
        self.request(GuardCommand::DeleteAccount { reply }, rx)
            .await?
            .map_err(FarmgateError::from)
    }

    /// Runs the revalidation check immediately.
    pub async fn check_now(&self) -> Result<Transition, FarmgateError> {
        let (reply, rx) = oneshot::channel();
        self.request(GuardCommand::CheckNow { reply }, rx).await
    }

    /// The latest published session.
    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    /// A receiver that sees every published session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.clone()
    }

    /// Whether the guard task is still running.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Stops both timers and ends the guard task. Resolves once the guard
    /// has stopped. Calling it on a stopped guard is a no-op.
    pub async fn teardown(&self) -> Result<(), FarmgateError> {
        let (reply, rx) = oneshot::channel();
        if self
            .sender
            .send(GuardCommand::Teardown { reply })
            .await
            .is_err()
        {
            return Ok(());
        }
        // A dropped reply also means the task is gone.
        let _ = rx.await;
        Ok(())
    }

    async fn request<T>(
        &self,
        command: GuardCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, FarmgateError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| FarmgateError::GuardStopped)?;
        rx.await.map_err(|_| FarmgateError::GuardStopped)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal guard state. Runs inside a Tokio task.
struct GuardActor<S: Storage, B: AuthBackend, P: Presenter> {
    controller: SessionController<S, B, P>,
    monitor: ActivityMonitor,
    receiver: mpsc::Receiver<GuardCommand>,
}

impl<S, B, P> GuardActor<S, B, P>
where
    S: Storage,
    B: AuthBackend,
    P: Presenter,
{
    /// Boot check, then commands and timer events until teardown.
    async fn run(mut self) {
        let boot = self.controller.init().await;
        self.sync_monitor();
        info!(?boot, "session guard started");

        loop {
            tokio::select! {
                // Commands first: activity that is already queued must reach
                // the timer before its old deadline is acted on.
                biased;

                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("every guard handle dropped");
                        self.monitor.shutdown();
                        break;
                    };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                event = self.monitor.next_event() => self.handle_event(event).await,
            }
        }

        info!(metrics = ?self.monitor.metrics(), "session guard stopped");
    }

    /// Returns `false` once the guard should stop.
    async fn handle_command(&mut self, cmd: GuardCommand) -> bool {
        match cmd {
            GuardCommand::Activity { kind } => {
                let active = self.controller.record_activity();
                if let ActivityOutcome::Restarted { deadline } =
                    self.monitor.on_activity(kind, active)
                {
                    trace!(%kind, ?deadline, "inactivity deadline moved");
                }
            }
            GuardCommand::Login { credentials, reply } => {
                let result = self.controller.login(&credentials).await;
                self.sync_monitor();
                let _ = reply.send(result);
            }
            GuardCommand::Logout { reply } => {
                let transition = self.controller.logout().await;
                self.sync_monitor();
                let _ = reply.send(transition);
            }
            GuardCommand::DeleteAccount { reply } => {
                let result = self.controller.delete_account().await;
                self.sync_monitor();
                let _ = reply.send(result);
            }
            GuardCommand::CheckNow { reply } => {
                let transition = self.controller.check_login_status().await;
                self.sync_monitor();
                let _ = reply.send(transition);
            }
            GuardCommand::Teardown { reply } => {
                self.monitor.shutdown();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn handle_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::InactivityExpired { deadline } => {
                info!(?deadline, "inactivity timeout reached");
                self.controller.force_logout(LogoutReason::Inactivity).await;
            }
            MonitorEvent::RevalidationDue(tick) => {
                if tick.overrun {
                    warn!(
                        tick = tick.tick,
                        skipped = tick.ticks_skipped,
                        "revalidation tick late"
                    );
                }
                let transition = self.controller.check_login_status().await;
                debug!(tick = tick.tick, ?transition, "revalidation tick");
            }
        }
        self.sync_monitor();
    }

    /// Keeps the inactivity timer armed exactly while a session exists.
    fn sync_monitor(&mut self) {
        let logged_in = self.controller.is_logged_in();
        let armed = self.monitor.timer().is_armed();
        if logged_in && !armed {
            self.monitor.start_session();
        } else if !logged_in && armed {
            self.monitor.end_session();
        }
    }
}

/// Spawns the guard task and returns a handle to it.
///
/// `channel_size` controls backpressure: once the channel is full,
/// requests wait and activity reports are dropped.
pub(crate) fn spawn_guard<S, B, P>(
    controller: SessionController<S, B, P>,
    monitor: ActivityMonitor,
    channel_size: usize,
) -> GuardHandle
where
    S: Storage,
    B: AuthBackend,
    P: Presenter,
{
    let (tx, rx) = mpsc::channel(channel_size);
    let session = controller.subscribe();

    let actor = GuardActor {
        controller,
        monitor,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    GuardHandle {
        sender: tx,
        session,
    }
}
