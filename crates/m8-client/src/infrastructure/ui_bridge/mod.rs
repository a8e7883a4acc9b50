//! UI bridge for the M8 host.
//!
//! Exposes session state (current state, device, background colour, last
//! report, button layout) to whatever UI embeds the host.  Follows Clean
//! Architecture: only this module references both the application layer and
//! the presentation layer.
//!
//! # Two directions
//!
//! ```text
//! SessionController ──HostSurface──>  StatusSurface ──writes──> HostAppState
//!                                                                    │
//! UI (poll) ────────────── get_session_status() <──────reads─────────┘
//! ```
//!
//! The session pushes changes through the [`HostSurface`] trait.
//! `StatusSurface` records them in the shared [`HostAppState`], and the UI
//! reads a serializable snapshot ([`SessionStatusDto`]) whenever it redraws.
//!
//! # `CommandResult<T>`
//!
//! All commands return `CommandResult<T>`, a unified envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```
//!
//! # std Mutex, not tokio Mutex
//!
//! `HostSurface` methods are synchronous and are called from inside the
//! event-loop task.  Every lock here is held only for a field read or write
//! and never across an `.await`, so `std::sync::Mutex` is sufficient.

pub mod mock;

use std::sync::{Arc, Mutex, MutexGuard};

use m8_core::{PreferenceSet, Rgb, SessionReport, SessionState};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::command_bridge::HostSurface;
use crate::application::input::ButtonLayout;
use crate::application::session::PreferenceStore;

// ── Shared application state ──────────────────────────────────────────────────

/// Runtime state shared between the session task and UI commands.
pub struct HostAppState {
    pub session: Mutex<SessionState>,
    pub background: Mutex<Option<Rgb>>,
    pub last_report: Mutex<Option<SessionReport>>,
    pub layout: Mutex<Option<ButtonLayout>>,
    pub alternate_controls_visible: Mutex<bool>,
    /// Times the UI was told to drop in-flight touches.
    pub touch_resets: Mutex<u64>,
}

impl HostAppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Default for HostAppState {
    fn default() -> Self {
        Self {
            session: Mutex::new(SessionState::Idle),
            background: Mutex::new(None),
            last_report: Mutex::new(None),
            layout: Mutex::new(None),
            alternate_controls_visible: Mutex::new(false),
            touch_resets: Mutex::new(0),
        }
    }
}

/// Locks `mutex`, recovering the value if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── HostSurface adapter ───────────────────────────────────────────────────────

/// A [`HostSurface`] that records every notification in [`HostAppState`].
pub struct StatusSurface {
    state: Arc<HostAppState>,
}

impl StatusSurface {
    pub fn new(state: Arc<HostAppState>) -> Self {
        Self { state }
    }
}

impl HostSurface for StatusSurface {
    fn set_background_color(&self, color: Rgb) {
        *lock(&self.state.background) = Some(color);
    }

    fn set_alternate_controls_visible(&self, visible: bool) {
        *lock(&self.state.alternate_controls_visible) = visible;
    }

    fn set_button_layout(&self, layout: ButtonLayout) {
        *lock(&self.state.layout) = Some(layout);
    }

    fn reset_touch_tracking(&self) {
        *lock(&self.state.touch_resets) += 1;
    }

    fn session_changed(&self, state: &SessionState) {
        if state.is_idle() {
            *lock(&self.state.layout) = None;
        }
        *lock(&self.state.session) = state.clone();
    }

    fn report(&self, report: &SessionReport) {
        match report {
            SessionReport::Connected => info!("M8 connected"),
            SessionReport::ConnectFailed(reason) => warn!("M8 connection failed: {reason}"),
            other => info!("M8 session ended: {other}"),
        }
        *lock(&self.state.last_report) = Some(report.clone());
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// Status snapshot returned to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusDto {
    /// State name, e.g. `"Active"` or `"AwaitingPermission"`.
    pub state: String,
    /// Display form of the session's device, if any.
    pub device: Option<String>,
    /// Background colour as `#rrggbb`.
    pub background: Option<String>,
    pub last_report: Option<String>,
    pub layout: Option<String>,
    pub alternate_controls_visible: bool,
    /// Increments on every orientation change; the UI drops any touch it is
    /// tracking when this moves.
    pub touch_resets: u64,
}

/// Unified response wrapper for UI commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    /// `true` if the command completed successfully; `false` on error.
    pub success: bool,
    /// The command's return value, present only when `success` is `true`.
    pub data: Option<T>,
    /// A human-readable error message, present only when `success` is `false`.
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the current session status snapshot.
pub async fn get_session_status(state: Arc<HostAppState>) -> CommandResult<SessionStatusDto> {
    let session = lock(&state.session).clone();
    let background = *lock(&state.background);
    let last_report = lock(&state.last_report).clone();
    let layout = *lock(&state.layout);
    let alternate = *lock(&state.alternate_controls_visible);
    let touch_resets = *lock(&state.touch_resets);

    CommandResult::ok(SessionStatusDto {
        state: session.name().to_string(),
        device: session.device().map(|d| d.to_string()),
        background: background.map(|c| c.to_string()),
        last_report: last_report.map(|r| r.to_string()),
        layout: layout.map(|l| format!("{l:?}")),
        alternate_controls_visible: alternate,
        touch_resets,
    })
}

/// Returns the preferences the next session would start with.
pub async fn get_preferences(store: Arc<dyn PreferenceStore>) -> CommandResult<PreferenceSet> {
    match store.snapshot() {
        Ok(preferences) => CommandResult::ok(preferences),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::config::MemoryPreferenceStore;
    use m8_core::{DeviceDescriptor, DeviceHandle};

    fn make_surface() -> (StatusSurface, Arc<HostAppState>) {
        let state = HostAppState::new();
        (StatusSurface::new(Arc::clone(&state)), state)
    }

    #[tokio::test]
    async fn test_get_session_status_returns_idle_initially() {
        // Arrange
        let state = HostAppState::new();

        // Act
        let result = get_session_status(state).await;

        // Assert
        assert!(result.success);
        let dto = result.data.unwrap();
        assert_eq!(dto.state, "Idle");
        assert_eq!(dto.device, None);
        assert_eq!(dto.last_report, None);
        assert_eq!(dto.touch_resets, 0);
    }

    #[tokio::test]
    async fn test_status_reflects_active_session_and_background() {
        // Arrange
        let (surface, state) = make_surface();
        let device = DeviceDescriptor::new(DeviceHandle(5), 0x16C0, 0x048A);

        // Act
        surface.set_button_layout(ButtonLayout::Overlay);
        surface.session_changed(&SessionState::Active(device));
        surface.set_background_color(Rgb::new(200, 100, 50));
        surface.report(&SessionReport::Connected);
        let dto = get_session_status(state).await.data.unwrap();

        // Assert
        assert_eq!(dto.state, "Active");
        assert_eq!(dto.device.as_deref(), Some("usb#5 [16c0:048a]"));
        assert_eq!(dto.background.as_deref(), Some("#c86432"));
        assert_eq!(dto.last_report.as_deref(), Some("connected"));
        assert_eq!(dto.layout.as_deref(), Some("Overlay"));
    }

    #[tokio::test]
    async fn test_touch_resets_are_counted_in_status() {
        // Arrange
        let (surface, state) = make_surface();

        // Act
        surface.reset_touch_tracking();
        surface.reset_touch_tracking();
        let dto = get_session_status(state).await.data.unwrap();

        // Assert
        assert_eq!(dto.touch_resets, 2);
    }

    #[tokio::test]
    async fn test_returning_to_idle_clears_layout_but_keeps_report() {
        let (surface, state) = make_surface();
        surface.set_button_layout(ButtonLayout::Embedded);
        surface.session_changed(&SessionState::Idle);
        surface.report(&SessionReport::Detached);

        let dto = get_session_status(state).await.data.unwrap();
        assert_eq!(dto.layout, None);
        assert_eq!(dto.last_report.as_deref(), Some("device detached"));
    }

    #[tokio::test]
    async fn test_get_preferences_reports_store_failure() {
        // Arrange
        let store = Arc::new(MemoryPreferenceStore::new(PreferenceSet::default()));
        store.set_failing(true);

        // Act
        let result = get_preferences(store as Arc<dyn PreferenceStore>).await;

        // Assert
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_get_preferences_returns_snapshot() {
        let store = Arc::new(MemoryPreferenceStore::new(PreferenceSet::default()));
        let result = get_preferences(store as Arc<dyn PreferenceStore>).await;
        assert_eq!(result.data.unwrap().audio_driver, "AAudio");
    }

    #[test]
    fn test_command_result_ok_sets_success_true() {
        let r: CommandResult<u32> = CommandResult::ok(99);
        assert!(r.success);
        assert_eq!(r.data.unwrap(), 99);
        assert!(r.error.is_none());
    }

    #[test]
    fn test_command_result_err_sets_success_false() {
        let r: CommandResult<u32> = CommandResult::err("oops");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert_eq!(r.error.unwrap(), "oops");
    }
}
