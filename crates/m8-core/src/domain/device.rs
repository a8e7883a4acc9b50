//! USB device descriptors and the M8 device matcher.
//!
//! # Two kinds of identity
//!
//! A USB device has two identities that matter to the host:
//!
//! - **Hardware identity** – the `(vendor_id, product_id)` pair burned into
//!   the device firmware.  Every M8 reports the same pair, so this answers
//!   "is this an M8?" and nothing more.  See [`matches`].
//!
//! - **Attachment identity** – the [`DeviceHandle`] the OS assigns when the
//!   device is plugged in.  Unplugging and replugging the same M8 produces a
//!   *new* handle.  Session code compares handles so that a late permission
//!   result for an old attachment can never affect a new one.

use serde::{Deserialize, Serialize};

/// OS-assigned identifier of one device attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceHandle(pub u32);

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "usb#{}", self.0)
    }
}

/// A `(vendor_id, product_id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl HardwareId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id }
    }
}

/// Hardware IDs that identify an M8.
///
/// | Vendor   | Product  | Device                   |
/// |----------|----------|--------------------------|
/// | `0x16C0` | `0x048A` | M8 headless (Teensy 4.1) |
/// | `0x16C0` | `0x048B` | M8 Model:02              |
pub const M8_HARDWARE_IDS: &[HardwareId] = &[
    HardwareId::new(0x16C0, 0x048A),
    HardwareId::new(0x16C0, 0x048B),
];

/// A USB device as reported by the OS.
///
/// Descriptors are transient: the OS hands them to the host in enumeration
/// results and broadcast events, and the host never owns the device behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub handle: DeviceHandle,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product_name: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(handle: DeviceHandle, vendor_id: u16, product_id: u16) -> Self {
        Self {
            handle,
            vendor_id,
            product_id,
            product_name: None,
        }
    }

    /// Sets the product name reported by the device.
    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    /// Returns the hardware identity of this device.
    pub fn hardware_id(&self) -> HardwareId {
        HardwareId::new(self.vendor_id, self.product_id)
    }

    /// Returns `true` if `other` is the same attachment (same OS handle).
    pub fn is_same_attachment(&self, other: &DeviceDescriptor) -> bool {
        self.handle == other.handle
    }
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{:04x}:{:04x}]",
            self.handle, self.vendor_id, self.product_id
        )?;
        if let Some(name) = &self.product_name {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

/// Returns `true` if `device` is M8 hardware.
///
/// Pure and total: a device that is not on the allow-list simply yields `false`.
pub fn matches(device: &DeviceDescriptor) -> bool {
    M8_HARDWARE_IDS.contains(&device.hardware_id())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
