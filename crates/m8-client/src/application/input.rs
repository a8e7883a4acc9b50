//! InputMapper: translates touches on named UI controls into M8 key events.
//!
//! This use case sits at the application layer and delegates to an
//! [`EngineConnection`] trait object for delivering keys to the device.
//! Engine implementations live in the infrastructure layer.
//!
//! The mapper is *armed* only while a session is active.  Touch events that
//! arrive while disarmed (for example a finger lifting just after the device
//! was unplugged) are ignored.

use std::sync::Arc;

use m8_core::{keymap::lookup_control, DeviceDescriptor, DeviceHandle, KeyEvent, KeyMask, M8Key};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::command_bridge::HostSurface;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine failed to open {device}: {reason}")]
    ConnectFailed { device: DeviceHandle, reason: String },
    #[error("engine is not connected")]
    NotConnected,
    #[error("engine I/O error: {0}")]
    Io(String),
}

/// Everything the engine needs to open a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub session_id: Uuid,
    pub device: DeviceDescriptor,
    /// Audio output device index from the preference snapshot.
    pub audio_device: u32,
}

/// The native rendering/audio engine, as seen by the host.
///
/// `connect` only *starts* the connection.  The outcome arrives later as a
/// `HostEvent::EngineConnected` or `HostEvent::EngineError`, and engine
/// commands arrive as `HostEvent::EngineCommand`.
pub trait EngineConnection: Send + Sync {
    /// Starts opening the device.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the connection cannot even be started.
    fn connect(&self, request: &ConnectRequest) -> Result<(), EngineError>;

    /// Tears down the engine connection and its audio resources.
    fn disconnect(&self);

    /// Forwards a key press or release.  Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the key could not be queued.
    fn send_key(&self, event: KeyEvent) -> Result<(), EngineError>;

    /// Hints which audio backend the engine should use (e.g. `"AAudio"`).
    fn set_audio_backend_hint(&self, name: &str);

    /// Locks or unlocks the display orientation.
    fn set_orientation_lock(&self, lock: bool);
}

/// Which button layout the host shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonLayout {
    /// Dedicated button overlay on top of the display.
    Overlay,
    /// Buttons embedded in the display layout.
    Embedded,
}

impl ButtonLayout {
    pub fn from_show_buttons(show_buttons: bool) -> Self {
        if show_buttons {
            ButtonLayout::Overlay
        } else {
            ButtonLayout::Embedded
        }
    }
}

/// Screen orientation reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Undefined,
}

/// The Input Mapper use case.
pub struct InputMapper {
    surface: Arc<dyn HostSurface>,
    engine: Option<Arc<dyn EngineConnection>>,
    layout: Option<ButtonLayout>,
    held: KeyMask,
}

impl InputMapper {
    pub fn new(surface: Arc<dyn HostSurface>) -> Self {
        Self {
            surface,
            engine: None,
            layout: None,
            held: KeyMask::new(),
        }
    }

    /// Starts forwarding keys to `engine` and shows `layout`.
    pub fn arm(&mut self, engine: Arc<dyn EngineConnection>, layout: ButtonLayout) {
        info!("input armed with {layout:?} layout");
        self.surface.set_button_layout(layout);
        self.engine = Some(engine);
        self.layout = Some(layout);
        self.held.clear();
    }

    /// Stops forwarding keys.
    pub fn disarm(&mut self) {
        if self.engine.take().is_some() {
            debug!("input disarmed");
        }
        self.layout = None;
        self.held.clear();
    }

    pub fn is_armed(&self) -> bool {
        self.engine.is_some()
    }

    pub fn layout(&self) -> Option<ButtonLayout> {
        self.layout
    }

    /// Keys currently held according to forwarded events.
    pub fn held_keys(&self) -> Vec<M8Key> {
        self.held.held()
    }

    /// Handles a touch press or release on the control named `control_id`.
    ///
    /// Returns `true` if a key event was forwarded to the engine.
    pub fn on_button_event(&mut self, control_id: &str, pressed: bool) -> bool {
        let Some(binding) = lookup_control(control_id) else {
            debug!("ignoring touch on unmapped control {control_id:?}");
            return false;
        };
        let Some(engine) = &self.engine else {
            debug!("ignoring {} while no session is active", binding.key);
            return false;
        };

        let event = KeyEvent {
            key: binding.key,
            pressed,
        };
        match engine.send_key(event) {
            Ok(()) => {
                self.held.apply(event);
                true
            }
            Err(e) => {
                warn!("failed to send {} to engine: {e}", binding.key);
                false
            }
        }
    }

    /// Handles an orientation change.
    ///
    /// Portrait shows the alternate controls and landscape hides them.  Touch
    /// tracking is reset on every change so a finger that went down in the old
    /// layout cannot leave a key stuck in the new one.  Keys still held are
    /// released at the engine first, since their touch-up will never arrive.
    pub fn on_orientation_changed(&mut self, orientation: Orientation) {
        match orientation {
            Orientation::Portrait => {
                debug!("orientation portrait: showing alternate controls");
                self.surface.set_alternate_controls_visible(true);
            }
            Orientation::Landscape => {
                debug!("orientation landscape: hiding alternate controls");
                self.surface.set_alternate_controls_visible(false);
            }
            Orientation::Undefined => {}
        }
        self.release_held();
        self.surface.reset_touch_tracking();
    }

    fn release_held(&mut self) {
        if let Some(engine) = &self.engine {
            for key in self.held.held() {
                if let Err(e) = engine.send_key(KeyEvent::release(key)) {
                    warn!("failed to release {key} on layout change: {e}");
                }
            }
        }
        self.held.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
