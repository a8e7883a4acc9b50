//! In-memory USB host for unit testing and headless runs.
//!
//! # Why a mock host?
//!
//! A real USB service needs a phone, a cable, and a user tapping "Allow" on a
//! dialog.  `MockUsbHost` replaces all of that with in-memory state:
//!
//! - `attach` / `detach` change what `device_list` returns.
//! - `grant` marks a device handle as already authorised.
//! - Every `request_permission` call is recorded so tests can count dialogs.
//! - Every `register_receiver` / `unregister_receiver` pair is tracked so
//!   tests can prove that no broadcast registration outlives its session.
//!
//! # Usage in tests
//!
//! ```ignore
//! let host = Arc::new(MockUsbHost::new());
//! host.attach(DeviceDescriptor::new(DeviceHandle(1), 0x16C0, 0x048A));
//!
//! let mut broker = PermissionBroker::new(Arc::clone(&host) as Arc<dyn UsbHost>);
//! broker.request_permission(&device);
//!
//! assert_eq!(host.active_registrations(BroadcastAction::UsbPermission), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use m8_core::{DeviceDescriptor, DeviceHandle};

use crate::application::permission::{BroadcastAction, ReceiverId, UsbError, UsbHost};

/// A USB host that keeps every device, grant, and registration in memory.
#[derive(Default)]
pub struct MockUsbHost {
    devices: Mutex<Vec<DeviceDescriptor>>,
    granted: Mutex<HashSet<DeviceHandle>>,
    permission_requests: Mutex<Vec<DeviceHandle>>,
    receivers: Mutex<HashMap<ReceiverId, BroadcastAction>>,
    next_receiver: AtomicU64,
    total_registrations: AtomicUsize,
    device_list_calls: AtomicUsize,
    /// When `true`, `device_list` fails as if the OS USB service were missing.
    unavailable: AtomicBool,
}

impl MockUsbHost {
    /// Creates a host with no devices attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugs in `device`.
    pub fn attach(&self, device: DeviceDescriptor) {
        self.devices.lock().unwrap().push(device);
    }

    /// Unplugs the device with `handle` and forgets its grant.
    pub fn detach(&self, handle: DeviceHandle) {
        self.devices.lock().unwrap().retain(|d| d.handle != handle);
        self.granted.lock().unwrap().remove(&handle);
    }

    /// Marks `handle` as already authorised.
    pub fn grant(&self, handle: DeviceHandle) {
        self.granted.lock().unwrap().insert(handle);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Handles passed to `request_permission`, in call order.
    pub fn permission_requests(&self) -> Vec<DeviceHandle> {
        self.permission_requests.lock().unwrap().clone()
    }

    /// Number of live registrations for `action`.
    pub fn active_registrations(&self, action: BroadcastAction) -> usize {
        self.receivers
            .lock()
            .unwrap()
            .values()
            .filter(|a| **a == action)
            .count()
    }

    /// Number of live registrations of any kind.
    pub fn total_active_registrations(&self) -> usize {
        self.receivers.lock().unwrap().len()
    }

    /// Number of `register_receiver` calls ever made.
    pub fn total_registrations(&self) -> usize {
        self.total_registrations.load(Ordering::SeqCst)
    }

    /// Number of `device_list` calls ever made.
    pub fn device_list_calls(&self) -> usize {
        self.device_list_calls.load(Ordering::SeqCst)
    }
}

impl UsbHost for MockUsbHost {
    fn device_list(&self) -> Result<Vec<DeviceDescriptor>, UsbError> {
        self.device_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UsbError::ServiceUnavailable("mock host offline".into()));
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    fn has_permission(&self, device: &DeviceDescriptor) -> bool {
        self.granted.lock().unwrap().contains(&device.handle)
    }

    fn request_permission(&self, device: &DeviceDescriptor) {
        self.permission_requests.lock().unwrap().push(device.handle);
    }

    fn register_receiver(&self, action: BroadcastAction) -> ReceiverId {
        let id = ReceiverId(self.next_receiver.fetch_add(1, Ordering::SeqCst));
        self.total_registrations.fetch_add(1, Ordering::SeqCst);
        self.receivers.lock().unwrap().insert(id, action);
        id
    }

    fn unregister_receiver(&self, id: ReceiverId) {
        self.receivers.lock().unwrap().remove(&id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
