//! # m8-core
//!
//! Shared library for the M8 headless host containing the device matcher,
//! session value types, the logical key tables, and the engine command codec.
//!
//! This crate has zero dependencies on OS APIs, USB stacks, or UI frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! The Dirtywave M8 is a hardware tracker.  In *headless* mode it has no screen
//! or buttons of its own: a host (phone, tablet, laptop) connects to it over
//! USB, draws its display, plays its audio, and forwards button presses to it.
//!
//! This crate (`m8-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure business types with no OS dependencies: which USB
//!   devices count as an M8, the states a device session can be in, and the
//!   immutable preference snapshot taken when a session starts.
//!
//! - **`keymap`** – The eight logical M8 keys and the static table mapping UI
//!   control identifiers (e.g. `"upAlt"`) to those keys.
//!
//! - **`protocol`** – How values cross the host/engine boundary.  The engine
//!   pushes tagged commands (`0x8001` = background colour changed) and the host
//!   pushes key state as a one-byte controller mask.

pub mod domain;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `m8_core::DeviceDescriptor` instead of `m8_core::domain::device::DeviceDescriptor`.
pub use domain::device::{matches, DeviceDescriptor, DeviceHandle, HardwareId, M8_HARDWARE_IDS};
pub use domain::preferences::PreferenceSet;
pub use domain::session::{SessionReport, SessionState};
pub use keymap::{lookup_control, KeyEvent, M8Key};
pub use protocol::command::{decode_command, EngineCommand, Rgb, BACKGROUND_COLOR_CHANGED};
pub use protocol::controller::{KeyMask, ProtocolError};
