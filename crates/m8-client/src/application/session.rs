//! SessionController: the device session state machine.
//!
//! The controller is the sole owner and sole mutator of the session.  It
//! reacts to user actions (`start`, `stop`), OS callbacks (permission results,
//! detaches), and engine callbacks (connected, error, commands), and drives
//! the [`PermissionBroker`], [`InputMapper`], and [`CommandBridge`].
//!
//! # State machine
//!
//! ```text
//! Idle --start()--> Searching
//! Searching --M8 found--> Connecting(d)          if already authorised
//! Searching --M8 found--> AwaitingPermission(d)  otherwise
//! Searching --no M8--> Idle                      report NoDevice
//! AwaitingPermission(d) --granted(d)--> Connecting(d)
//! AwaitingPermission(d) --denied(d)--> Idle      report PermissionDenied
//! Connecting(d) --engine connected(d)--> Active(d)
//! Connecting(d) --engine error(d)--> Idle        report ConnectFailed
//! Active(d) --detach(d)--> Idle                  report Detached
//! any --event for d' != d--> unchanged
//! ```
//!
//! # Resources tied to a session
//!
//! From `start()` until the session returns to `Idle` the controller holds:
//!
//! - a `DeviceDetached` broadcast registration,
//! - the [`PreferenceSet`] snapshot taken at `start()`,
//! - while awaiting permission, the broker's `UsbPermission` registration,
//! - from `Connecting` onwards, the engine connection.
//!
//! [`SessionController::end_session`] is the only place these are released,
//! and it runs at most once per session because it leaves the state `Idle`.
//!
//! # Limitation
//!
//! Permission requests have no timeout.  An OS that never answers leaves the
//! session in `AwaitingPermission` until the device is detached or the host
//! calls `stop()`.

use std::sync::Arc;

use m8_core::{matches, DeviceDescriptor, PreferenceSet, SessionReport, SessionState};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::command_bridge::{CommandBridge, HostSurface};
use crate::application::input::{ButtonLayout, ConnectRequest, EngineConnection, InputMapper, Orientation};
use crate::application::permission::{
    BroadcastAction, PermissionBroker, PermissionOutcome, Registration, UsbError, UsbHost,
};

/// Error type for reading the preference snapshot.
#[derive(Debug, Error)]
#[error("preferences unavailable: {0}")]
pub struct PreferenceError(pub String);

/// Read-only access to the user's preferences.
pub trait PreferenceStore: Send + Sync {
    /// Returns the current preferences as an immutable snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError`] if the store cannot be read.
    fn snapshot(&self) -> Result<PreferenceSet, PreferenceError>;
}

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The OS USB service is missing.  Not retryable.
    #[error("USB service unavailable")]
    UsbServiceUnavailable(#[source] UsbError),

    /// The preference snapshot could not be taken; the session did not start.
    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

impl SessionError {
    /// Returns `true` if the host cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::UsbServiceUnavailable(_))
    }
}

/// Per-session resources, dropped when the session ends.
#[derive(Debug)]
struct SessionContext {
    id: Uuid,
    preferences: PreferenceSet,
    _detach_registration: Registration,
}

/// The Session Controller.
pub struct SessionController {
    usb: Arc<dyn UsbHost>,
    engine: Arc<dyn EngineConnection>,
    preferences: Arc<dyn PreferenceStore>,
    surface: Arc<dyn HostSurface>,
    state: SessionState,
    context: Option<SessionContext>,
    permissions: PermissionBroker,
    input: InputMapper,
    commands: CommandBridge,
}

impl SessionController {
    pub fn new(
        usb: Arc<dyn UsbHost>,
        engine: Arc<dyn EngineConnection>,
        preferences: Arc<dyn PreferenceStore>,
        surface: Arc<dyn HostSurface>,
    ) -> Self {
        Self {
            permissions: PermissionBroker::new(Arc::clone(&usb)),
            input: InputMapper::new(Arc::clone(&surface)),
            commands: CommandBridge::new(Arc::clone(&surface)),
            usb,
            engine,
            preferences,
            surface,
            state: SessionState::Idle,
            context: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Identifier of the current session, for log correlation.
    pub fn session_id(&self) -> Option<Uuid> {
        self.context.as_ref().map(|c| c.id)
    }

    pub fn input(&self) -> &InputMapper {
        &self.input
    }

    pub fn commands(&self) -> &CommandBridge {
        &self.commands
    }

    // ── User actions ──────────────────────────────────────────────────────────

    /// Starts a new session: snapshot preferences, scan, and connect or ask
    /// for permission.
    ///
    /// Calling `start` while a session exists is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UsbServiceUnavailable`] if the device list
    /// cannot be read, or [`SessionError::Preferences`] if the preference
    /// snapshot fails.  The session is `Idle` after either error.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if !self.state.is_idle() {
            warn!("start() ignored: session already in {}", self.state);
            return Ok(());
        }

        let preferences = self.preferences.snapshot()?;
        let id = Uuid::new_v4();
        info!(session = %id, "searching for an M8 device");
        self.context = Some(SessionContext {
            id,
            preferences,
            _detach_registration: Registration::acquire(&self.usb, BroadcastAction::DeviceDetached),
        });
        self.set_state(SessionState::Searching);

        // Always re-enumerate; never reuse a device list from an earlier session.
        let devices = match self.usb.device_list() {
            Ok(devices) => devices,
            Err(e) => {
                error!("cannot enumerate USB devices: {e}");
                self.end_session(None);
                return Err(SessionError::UsbServiceUnavailable(e));
            }
        };

        match devices.into_iter().find(matches) {
            Some(device) => self.on_device_found(device),
            None => {
                info!("no M8 device found");
                self.end_session(Some(SessionReport::NoDevice));
            }
        }
        Ok(())
    }

    /// Ends the current session from any state.  No-op when idle.
    pub fn stop(&mut self) {
        if self.state.is_idle() {
            debug!("stop() ignored: no session");
            return;
        }
        info!("stopping session in {}", self.state);
        self.end_session(Some(SessionReport::Stopped));
    }

    // ── OS callbacks ──────────────────────────────────────────────────────────

    /// Handles the answer to a permission dialog.
    pub fn on_permission_result(&mut self, device: &DeviceDescriptor, granted: bool) {
        if !matches!(&self.state, SessionState::AwaitingPermission(pending) if pending.is_same_attachment(device))
        {
            debug!("dropping permission result for {device} in {}", self.state);
            return;
        }

        match self.permissions.resolve(device, granted) {
            PermissionOutcome::Granted(device) => {
                info!("USB permission granted for {device}");
                self.begin_connect(device);
            }
            PermissionOutcome::Denied(device) => {
                info!("USB permission denied for {device}");
                self.end_session(Some(SessionReport::PermissionDenied));
            }
            PermissionOutcome::Stale => {}
        }
    }

    /// Handles a USB detach broadcast.
    pub fn on_device_detached(&mut self, device: &DeviceDescriptor) {
        if !self.is_current_device(device) {
            debug!("ignoring detach of {device} in {}", self.state);
            return;
        }
        info!("device {device} was detached in {}", self.state);
        self.end_session(Some(SessionReport::Detached));
    }

    // ── Engine callbacks ──────────────────────────────────────────────────────

    /// The engine finished opening `device`.
    pub fn on_engine_connected(&mut self, device: &DeviceDescriptor) {
        let SessionState::Connecting(current) = &self.state else {
            debug!("ignoring engine connected for {device} in {}", self.state);
            return;
        };
        if !current.is_same_attachment(device) {
            debug!("ignoring engine connected for {device}: connecting {current}");
            return;
        }
        let device = current.clone();
        self.enter_active(device);
    }

    /// The engine failed while connecting to or running `device`.
    pub fn on_engine_error(&mut self, device: &DeviceDescriptor, reason: &str) {
        let relevant = matches!(
            &self.state,
            SessionState::Connecting(d) | SessionState::Active(d) if d.is_same_attachment(device)
        );
        if !relevant {
            debug!("ignoring engine error for {device} in {}: {reason}", self.state);
            return;
        }
        error!("engine error on {device}: {reason}");
        self.end_session(Some(SessionReport::ConnectFailed(reason.to_string())));
    }

    /// Routes an engine command to the Command Bridge.
    pub fn on_engine_command(&mut self, tag: u32, payload: u32) -> bool {
        self.commands.on_engine_command(tag, payload)
    }

    // ── UI callbacks ──────────────────────────────────────────────────────────

    /// Routes a touch on a named control to the Input Mapper.
    pub fn on_button_event(&mut self, control_id: &str, pressed: bool) -> bool {
        self.input.on_button_event(control_id, pressed)
    }

    /// Routes an orientation change to the Input Mapper.
    pub fn on_orientation_changed(&mut self, orientation: Orientation) {
        self.input.on_orientation_changed(orientation);
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    fn on_device_found(&mut self, device: DeviceDescriptor) {
        info!("found M8 device {device}");
        if self.permissions.has_permission(&device) {
            info!("USB permission already granted for {device}");
            self.begin_connect(device);
        } else {
            self.permissions.request_permission(&device);
            self.set_state(SessionState::AwaitingPermission(device));
        }
    }

    fn begin_connect(&mut self, device: DeviceDescriptor) {
        let Some(context) = &self.context else {
            warn!("cannot connect {device}: no session context");
            return;
        };
        let request = ConnectRequest {
            session_id: context.id,
            device: device.clone(),
            audio_device: context.preferences.audio_device,
        };

        self.set_state(SessionState::Connecting(device));
        if let Err(e) = self.engine.connect(&request) {
            error!("engine connect failed: {e}");
            self.end_session(Some(SessionReport::ConnectFailed(e.to_string())));
        }
    }

    fn enter_active(&mut self, device: DeviceDescriptor) {
        let Some(context) = &self.context else {
            warn!("cannot activate {device}: no session context");
            return;
        };
        let preferences = &context.preferences;
        self.engine.set_audio_backend_hint(&preferences.audio_driver);
        self.engine.set_orientation_lock(preferences.lock_orientation);
        let layout = ButtonLayout::from_show_buttons(preferences.show_buttons);

        self.input.arm(Arc::clone(&self.engine), layout);
        self.commands.arm(device.handle);
        self.set_state(SessionState::Active(device));
        self.surface.report(&SessionReport::Connected);
    }

    /// Releases every session resource and returns to `Idle`.
    fn end_session(&mut self, report: Option<SessionReport>) {
        let previous = std::mem::take(&mut self.state);
        if matches!(previous, SessionState::Connecting(_) | SessionState::Active(_)) {
            debug!("tearing down engine connection");
            self.engine.disconnect();
        }
        self.permissions.cancel();
        self.input.disarm();
        self.commands.disarm();
        self.context = None;

        info!("session {previous} -> Idle");
        self.surface.session_changed(&self.state);
        if let Some(report) = report {
            self.surface.report(&report);
        }
    }

    fn set_state(&mut self, next: SessionState) {
        info!("session {} -> {next}", self.state);
        self.state = next;
        self.surface.session_changed(&self.state);
    }

    fn is_current_device(&self, device: &DeviceDescriptor) -> bool {
        self.state
            .device()
            .is_some_and(|current| current.is_same_attachment(device))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
