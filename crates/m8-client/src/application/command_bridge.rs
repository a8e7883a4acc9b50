//! CommandBridge: applies commands pushed by the engine to the host UI.
//!
//! The engine talks to the host through a tiny tagged channel: a 32-bit tag
//! and a 32-bit payload.  Today only one tag exists (background colour
//! change, `0x8001`).  Unknown tags are *not* errors: the bridge answers
//! "not handled" and does nothing, so an older host keeps working against a
//! newer engine.

use std::sync::Arc;

use m8_core::{decode_command, DeviceHandle, EngineCommand, Rgb, SessionReport, SessionState};
use tracing::{debug, info};

use crate::application::input::ButtonLayout;

/// The host UI, as seen by the session core.
///
/// Every method is a one-way notification; the UI owns how it renders them.
pub trait HostSurface: Send + Sync {
    /// Repaints the area around the device display.
    fn set_background_color(&self, color: Rgb);

    /// Shows or hides the alternate (portrait) button controls.
    fn set_alternate_controls_visible(&self, visible: bool);

    /// Shows the given button layout.
    fn set_button_layout(&self, layout: ButtonLayout);

    /// Drops any in-progress touch tracking.
    fn reset_touch_tracking(&self);

    /// The session moved to `state`.
    fn session_changed(&self, state: &SessionState);

    /// Surfaces a session outcome to the user.
    fn report(&self, report: &SessionReport);
}

/// The Command Bridge use case.
pub struct CommandBridge {
    surface: Arc<dyn HostSurface>,
    armed_for: Option<DeviceHandle>,
    background: Option<Rgb>,
}

impl CommandBridge {
    pub fn new(surface: Arc<dyn HostSurface>) -> Self {
        Self {
            surface,
            armed_for: None,
            background: None,
        }
    }

    /// Starts applying commands for the session on `device`.
    pub fn arm(&mut self, device: DeviceHandle) {
        debug!("command bridge armed for {device}");
        self.armed_for = Some(device);
    }

    /// Stops handling commands and forgets the last background colour.
    pub fn disarm(&mut self) {
        self.armed_for = None;
        self.background = None;
    }

    pub fn armed_for(&self) -> Option<DeviceHandle> {
        self.armed_for
    }

    /// Last background colour applied, if any.
    pub fn background(&self) -> Option<Rgb> {
        self.background
    }

    /// Handles one engine command.  Returns `true` if it was handled.
    ///
    /// Unknown tags, and any command arriving while no session is active,
    /// return `false` with no effect.
    pub fn on_engine_command(&mut self, tag: u32, payload: u32) -> bool {
        let Some(device) = self.armed_for else {
            debug!("dropping engine command 0x{tag:04X}: no active session");
            return false;
        };

        match decode_command(tag, payload) {
            Some(EngineCommand::BackgroundColorChanged(color)) => {
                info!("background colour of {device} changed to {color}");
                self.background = Some(color);
                self.surface.set_background_color(color);
                true
            }
            None => false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
