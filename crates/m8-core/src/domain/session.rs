//! Device session states and user-visible outcomes.
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//! Idle ──start()──► Searching ──M8 found──► AwaitingPermission ──granted──► Connecting
//!  ▲                   │                         │                             │
//!  │              no device                   denied                   engine connected
//!  │                   │                         │                             ▼
//!  └───────────────────┴─────────────────────────┴──────── detach ◄────── Active
//! ```
//!
//! - `Searching`: the USB device list is being scanned.
//! - `AwaitingPermission`: the OS permission dialog is showing for one device.
//! - `Connecting`: the engine was asked to open the device.
//! - `Active`: the engine is running; keys and commands flow.
//!
//! A detach is not a resting state: the session is torn down and returns to
//! `Idle` in the same step, and the detach is surfaced as
//! [`SessionReport::Detached`].

use serde::{Deserialize, Serialize};

use crate::domain::device::DeviceDescriptor;

/// State of the single device session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No session; ready for `start()`.
    #[default]
    Idle,
    /// Enumerating USB devices.
    Searching,
    /// Waiting for the OS permission result for this device.
    AwaitingPermission(DeviceDescriptor),
    /// The engine is opening this device.
    Connecting(DeviceDescriptor),
    /// The engine is running against this device.
    Active(DeviceDescriptor),
}

impl SessionState {
    /// Returns the device this state is bound to, if any.
    pub fn device(&self) -> Option<&DeviceDescriptor> {
        match self {
            SessionState::AwaitingPermission(d)
            | SessionState::Connecting(d)
            | SessionState::Active(d) => Some(d),
            SessionState::Idle | SessionState::Searching => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }

    /// Short name used in logs and status DTOs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Searching => "Searching",
            SessionState::AwaitingPermission(_) => "AwaitingPermission",
            SessionState::Connecting(_) => "Connecting",
            SessionState::Active(_) => "Active",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.device() {
            Some(d) => write!(f, "{}({})", self.name(), d.handle),
            None => f.write_str(self.name()),
        }
    }
}

/// Outcome reported to the user and the log.
///
/// None of these are faults: every negative outcome returns the session to
/// `Idle`, and the user retries with a new `start()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionReport {
    /// No M8 was present when the device list was scanned.
    NoDevice,
    /// The user denied USB access.
    PermissionDenied,
    /// The engine failed to open the device.
    ConnectFailed(String),
    /// The engine is running.
    Connected,
    /// The active device was unplugged.
    Detached,
    /// The session was ended by the host.
    Stopped,
}

impl std::fmt::Display for SessionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionReport::NoDevice => f.write_str("no device"),
            SessionReport::PermissionDenied => f.write_str("permission denied"),
            SessionReport::ConnectFailed(reason) => write!(f, "connection failed: {reason}"),
            SessionReport::Connected => f.write_str("connected"),
            SessionReport::Detached => f.write_str("device detached"),
            SessionReport::Stopped => f.write_str("stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::DeviceHandle;

    #[test]
    fn test_default_state_is_idle() {
        assert!(SessionState::default().is_idle());
    }

    #[test]
    fn test_device_is_present_only_for_bound_states() {
        let d = DeviceDescriptor::new(DeviceHandle(1), 0x16C0, 0x048A);
        assert!(SessionState::Idle.device().is_none());
        assert!(SessionState::Searching.device().is_none());
        assert_eq!(SessionState::AwaitingPermission(d.clone()).device(), Some(&d));
        assert_eq!(SessionState::Connecting(d.clone()).device(), Some(&d));
        assert_eq!(SessionState::Active(d.clone()).device(), Some(&d));
    }

    #[test]
    fn test_display_includes_handle() {
        let d = DeviceDescriptor::new(DeviceHandle(5), 0x16C0, 0x048A);
        assert_eq!(SessionState::Active(d).to_string(), "Active(usb#5)");
        assert_eq!(SessionState::Searching.to_string(), "Searching");
    }

    #[test]
    fn test_report_messages() {
        assert_eq!(SessionReport::NoDevice.to_string(), "no device");
        assert_eq!(SessionReport::PermissionDenied.to_string(), "permission denied");
    }
}
