//! PermissionBroker: OS authorisation for one USB device at a time.
//!
//! # How USB permission works (for beginners)
//!
//! Mobile operating systems do not let an app open a USB device just because
//! it is plugged in.  The app first asks "do I already have permission?"
//! (synchronous), and if not, asks the OS to show a dialog.  The user's answer
//! comes back *later* as a broadcast that the app must have registered for.
//!
//! ```text
//! request_permission(d)
//!   ├─ register_receiver(UsbPermission)   ← must happen before the request
//!   └─ host.request_permission(d)         ← OS shows dialog
//!                 ⋮
//! HostEvent::PermissionResult { d, granted }
//!   └─ resolve(d, granted)                ← registration released here
//! ```
//!
//! # Stale results
//!
//! If the device is unplugged while the dialog is open and plugged back in,
//! the old dialog's answer can arrive after a new request was issued for the
//! new attachment.  [`PermissionBroker::resolve`] compares device handles and
//! drops results for any attachment other than the pending one.

use std::sync::Arc;

use m8_core::DeviceDescriptor;
use thiserror::Error;
use tracing::{debug, info};

/// Error type for the OS USB subsystem.
#[derive(Debug, Error)]
pub enum UsbError {
    /// The OS USB service could not be obtained.
    #[error("USB service not available: {0}")]
    ServiceUnavailable(String),
}

/// Category of system broadcast the host can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastAction {
    /// Result of a permission dialog.
    UsbPermission,
    /// A USB device was unplugged.
    DeviceDetached,
}

/// Identifier returned by [`UsbHost::register_receiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(pub u64);

/// The OS USB subsystem.
///
/// Results of `request_permission` and detach notifications are not returned
/// here: the OS adapter delivers them as `HostEvent`s on the event channel.
pub trait UsbHost: Send + Sync {
    /// Enumerates attached USB devices.
    ///
    /// # Errors
    ///
    /// Returns [`UsbError::ServiceUnavailable`] if the OS USB service is missing.
    fn device_list(&self) -> Result<Vec<DeviceDescriptor>, UsbError>;

    /// Returns `true` if the app is already authorised to open `device`.
    fn has_permission(&self, device: &DeviceDescriptor) -> bool;

    /// Asks the OS to show the permission dialog for `device`.
    fn request_permission(&self, device: &DeviceDescriptor);

    /// Starts delivering broadcasts of `action`.
    fn register_receiver(&self, action: BroadcastAction) -> ReceiverId;

    /// Stops delivering broadcasts for `id`.
    fn unregister_receiver(&self, id: ReceiverId);
}

/// A broadcast registration that is released when dropped.
pub struct Registration {
    host: Arc<dyn UsbHost>,
    id: ReceiverId,
    action: BroadcastAction,
}

impl Registration {
    /// Registers for `action` on `host`.
    pub fn acquire(host: &Arc<dyn UsbHost>, action: BroadcastAction) -> Self {
        let id = host.register_receiver(action);
        debug!("registered receiver {id:?} for {action:?}");
        Self {
            host: Arc::clone(host),
            id,
            action,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        debug!("unregistering receiver {:?} for {:?}", self.id, self.action);
        self.host.unregister_receiver(self.id);
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("action", &self.action)
            .finish()
    }
}

/// How a permission result relates to the pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted(DeviceDescriptor),
    Denied(DeviceDescriptor),
    /// The result is for a device that is not pending; it was dropped.
    Stale,
}

#[derive(Debug)]
struct PendingRequest {
    device: DeviceDescriptor,
    _registration: Registration,
}

/// Tracks the single outstanding permission request.
pub struct PermissionBroker {
    host: Arc<dyn UsbHost>,
    pending: Option<PendingRequest>,
}

impl PermissionBroker {
    pub fn new(host: Arc<dyn UsbHost>) -> Self {
        Self {
            host,
            pending: None,
        }
    }

    /// Queries the OS for existing authorisation.
    pub fn has_permission(&self, device: &DeviceDescriptor) -> bool {
        self.host.has_permission(device)
    }

    /// Requests permission for `device`.
    ///
    /// A second request for the device that is already pending is a no-op.
    /// A request for a different device replaces the pending one.
    pub fn request_permission(&mut self, device: &DeviceDescriptor) {
        if let Some(pending) = &self.pending {
            if pending.device.is_same_attachment(device) {
                debug!("permission request for {device} already pending");
                return;
            }
            debug!("replacing pending permission request for {}", pending.device);
        }

        // Drop any previous registration before taking a new one so at most
        // one UsbPermission receiver is ever live.
        self.pending = None;
        let registration = Registration::acquire(&self.host, BroadcastAction::UsbPermission);
        info!("requesting USB permission for {device}");
        self.host.request_permission(device);
        self.pending = Some(PendingRequest {
            device: device.clone(),
            _registration: registration,
        });
    }

    /// Matches a permission result against the pending request.
    ///
    /// On a match the pending request is cleared and its registration
    /// released.  Results for other devices leave the pending request as-is.
    pub fn resolve(&mut self, device: &DeviceDescriptor, granted: bool) -> PermissionOutcome {
        let is_pending = self
            .pending
            .as_ref()
            .is_some_and(|p| p.device.is_same_attachment(device));
        if !is_pending {
            debug!("dropping permission result for {device}: not the pending device");
            return PermissionOutcome::Stale;
        }

        let Some(pending) = self.pending.take() else {
            return PermissionOutcome::Stale;
        };
        if granted {
            PermissionOutcome::Granted(pending.device)
        } else {
            PermissionOutcome::Denied(pending.device)
        }
    }

    /// Abandons the pending request, if any.  Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn pending_device(&self) -> Option<&DeviceDescriptor> {
        self.pending.as_ref().map(|p| &p.device)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::usb::mock::MockUsbHost;
    use m8_core::DeviceHandle;

    fn m8(handle: u32) -> DeviceDescriptor {
        DeviceDescriptor::new(DeviceHandle(handle), 0x16C0, 0x048A)
    }

    fn make_broker() -> (PermissionBroker, Arc<MockUsbHost>) {
        let host = Arc::new(MockUsbHost::new());
        let broker = PermissionBroker::new(Arc::clone(&host) as Arc<dyn UsbHost>);
        (broker, host)
    }

    #[test]
    fn test_request_registers_one_receiver_and_asks_os() {
        // Arrange
        let (mut broker, host) = make_broker();

        // Act
        broker.request_permission(&m8(1));

        // Assert
        assert_eq!(host.active_registrations(BroadcastAction::UsbPermission), 1);
        assert_eq!(host.permission_requests(), vec![DeviceHandle(1)]);
        assert_eq!(broker.pending_device(), Some(&m8(1)));
    }

    #[test]
    fn test_second_request_for_same_device_is_noop() {
        // Arrange
        let (mut broker, host) = make_broker();
        broker.request_permission(&m8(1));

        // Act
        broker.request_permission(&m8(1));

        // Assert – still one dialog and one receiver
        assert_eq!(host.permission_requests().len(), 1);
        assert_eq!(host.active_registrations(BroadcastAction::UsbPermission), 1);
    }

    #[test]
    fn test_request_for_other_device_replaces_without_leaking() {
        // Arrange
        let (mut broker, host) = make_broker();
        broker.request_permission(&m8(1));

        // Act
        broker.request_permission(&m8(2));

        // Assert
        assert_eq!(broker.pending_device(), Some(&m8(2)));
        assert_eq!(host.active_registrations(BroadcastAction::UsbPermission), 1);
        assert_eq!(host.total_registrations(), 2);
    }

    #[test]
    fn test_resolve_granted_clears_pending_and_releases_registration() {
        // Arrange
        let (mut broker, host) = make_broker();
        broker.request_permission(&m8(1));

        // Act
        let outcome = broker.resolve(&m8(1), true);

        // Assert
        assert_eq!(outcome, PermissionOutcome::Granted(m8(1)));
        assert!(broker.pending_device().is_none());
        assert_eq!(host.active_registrations(BroadcastAction::UsbPermission), 0);
    }

    #[test]
    fn test_resolve_denied_is_reported_not_an_error() {
        let (mut broker, _host) = make_broker();
        broker.request_permission(&m8(1));
        assert_eq!(broker.resolve(&m8(1), false), PermissionOutcome::Denied(m8(1)));
    }

    #[test]
    fn test_resolve_for_other_device_is_stale_and_keeps_pending() {
        // Arrange
        let (mut broker, host) = make_broker();
        broker.request_permission(&m8(1));

        // Act – result for an old attachment of the same hardware
        let outcome = broker.resolve(&m8(9), true);

        // Assert
        assert_eq!(outcome, PermissionOutcome::Stale);
        assert_eq!(broker.pending_device(), Some(&m8(1)));
        assert_eq!(host.active_registrations(BroadcastAction::UsbPermission), 1);
    }

    #[test]
    fn test_resolve_without_pending_request_is_stale() {
        let (mut broker, _host) = make_broker();
        assert_eq!(broker.resolve(&m8(1), true), PermissionOutcome::Stale);
    }

    #[test]
    fn test_cancel_releases_registration() {
        // Arrange
        let (mut broker, host) = make_broker();
        broker.request_permission(&m8(1));

        // Act
        let was_pending = broker.cancel();

        // Assert
        assert!(was_pending);
        assert!(!broker.cancel());
        assert_eq!(host.active_registrations(BroadcastAction::UsbPermission), 0);
    }

    #[test]
    fn test_has_permission_delegates_to_host() {
        let (broker, host) = make_broker();
        host.grant(DeviceHandle(4));
        assert!(broker.has_permission(&m8(4)));
        assert!(!broker.has_permission(&m8(5)));
    }
}
