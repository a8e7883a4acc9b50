//! The single inbound event channel and the session dispatch loop.
//!
//! # Why one channel? (for beginners)
//!
//! The session receives callbacks from four independent sources: the user
//! (start/stop), the OS (permission dialogs, unplug broadcasts), the engine
//! (connected, failed, commands), and the UI (touches, rotation).  Each can
//! fire on its own thread.  Rather than share the session behind a lock,
//! every source sends a [`HostEvent`] into one `tokio::sync::mpsc` channel and
//! a single task applies them in arrival order:
//!
//! ```text
//! OS broadcast thread ──┐
//! engine callback ──────┼──> HostEventSender ──> mpsc ──> run_event_loop()
//! UI thread ────────────┤                                   └─ SessionController
//! Ctrl-C handler ───────┘
//! ```
//!
//! Because one task owns the [`SessionController`], no session state is ever
//! observed half-updated, and "detach supersedes an in-flight connect" is
//! simply a matter of which event was queued first.
//!
//! # Sending from foreign threads
//!
//! [`HostEventSender::send`] is `async` and waits for channel space.  OS and
//! engine callbacks usually run on plain threads and should use
//! [`HostEventSender::blocking_send`] (never from inside the runtime) or
//! [`HostEventSender::try_send`] (never blocks; fails when the channel is
//! full).

use m8_core::DeviceDescriptor;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::application::input::Orientation;
use crate::application::session::{SessionController, SessionError};

/// Every input the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The user asked to connect.
    Start,
    /// The user asked to disconnect.
    Stop,
    /// Answer to a permission dialog.
    PermissionResult {
        device: DeviceDescriptor,
        granted: bool,
    },
    /// A USB device was unplugged.
    DeviceDetached { device: DeviceDescriptor },
    /// The engine finished opening `device`.
    EngineConnected { device: DeviceDescriptor },
    /// The engine failed on `device`.
    EngineError {
        device: DeviceDescriptor,
        reason: String,
    },
    /// A tagged command pushed by the engine.
    EngineCommand { tag: u32, payload: u32 },
    /// A touch press or release on a named control.
    Button { control_id: String, pressed: bool },
    /// The display orientation changed.
    OrientationChanged(Orientation),
    /// End the session and stop the loop.
    Shutdown,
}

/// Error type for posting events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventSendError {
    /// The event loop has exited.
    #[error("event loop has shut down")]
    Closed,
    /// The channel is at capacity.
    #[error("event channel is full")]
    Full,
}

/// Cloneable handle for posting [`HostEvent`]s to the session.
#[derive(Debug, Clone)]
pub struct HostEventSender {
    inner: mpsc::Sender<HostEvent>,
}

impl HostEventSender {
    /// Posts `event`, waiting for channel space.
    pub async fn send(&self, event: HostEvent) -> Result<(), EventSendError> {
        self.inner
            .send(event)
            .await
            .map_err(|_| EventSendError::Closed)
    }

    /// Posts `event` without waiting.
    pub fn try_send(&self, event: HostEvent) -> Result<(), EventSendError> {
        self.inner.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => EventSendError::Full,
            TrySendError::Closed(_) => EventSendError::Closed,
        })
    }

    /// Posts `event` from a thread outside the tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_send(&self, event: HostEvent) -> Result<(), EventSendError> {
        self.inner
            .blocking_send(event)
            .map_err(|_| EventSendError::Closed)
    }
}

/// Creates the session's event channel with room for `capacity` events.
pub fn channel(capacity: usize) -> (HostEventSender, mpsc::Receiver<HostEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (HostEventSender { inner: tx }, rx)
}

/// What the loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Shutdown,
}

impl SessionController {
    /// Applies one event.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from `start()`.
    pub fn handle(&mut self, event: HostEvent) -> Result<Dispatch, SessionError> {
        match event {
            HostEvent::Start => self.start()?,
            HostEvent::Stop => self.stop(),
            HostEvent::PermissionResult { device, granted } => {
                self.on_permission_result(&device, granted)
            }
            HostEvent::DeviceDetached { device } => self.on_device_detached(&device),
            HostEvent::EngineConnected { device } => self.on_engine_connected(&device),
            HostEvent::EngineError { device, reason } => self.on_engine_error(&device, &reason),
            HostEvent::EngineCommand { tag, payload } => {
                if !self.on_engine_command(tag, payload) {
                    debug!("engine command 0x{tag:04X} not handled");
                }
            }
            HostEvent::Button {
                control_id,
                pressed,
            } => {
                self.on_button_event(&control_id, pressed);
            }
            HostEvent::OrientationChanged(orientation) => {
                self.on_orientation_changed(orientation)
            }
            HostEvent::Shutdown => {
                self.stop();
                return Ok(Dispatch::Shutdown);
            }
        }
        Ok(Dispatch::Continue)
    }
}

/// Runs the session until `Shutdown`, a fatal error, or every sender is dropped.
///
/// Non-fatal errors (an unreadable preference file) are logged and the loop
/// keeps going; the session is `Idle` and the user may retry.  The session is
/// always stopped before this returns, and the controller is handed back.
///
/// # Errors
///
/// Returns the first fatal [`SessionError`].
pub async fn run_event_loop(
    mut controller: SessionController,
    mut events: mpsc::Receiver<HostEvent>,
) -> Result<SessionController, SessionError> {
    info!("session event loop running");

    while let Some(event) = events.recv().await {
        debug!("event: {event:?}");
        match controller.handle(event) {
            Ok(Dispatch::Continue) => {}
            Ok(Dispatch::Shutdown) => {
                info!("session event loop shutting down");
                return Ok(controller);
            }
            Err(e) if e.is_fatal() => {
                error!("fatal session error: {e}");
                controller.stop();
                return Err(e);
            }
            Err(e) => warn!("session did not start: {e}"),
        }
    }

    info!("all event senders dropped; stopping session");
    controller.stop();
    Ok(controller)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
