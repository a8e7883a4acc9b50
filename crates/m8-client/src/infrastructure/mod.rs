//! Infrastructure layer for the M8 host.
//!
//! Contains the adapters behind the application-layer traits: the USB host,
//! the engine connection, the host UI surface, and file-system storage for
//! preferences and configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and `m8_core`,
//! but MUST NOT be imported by the `application` or domain layers (test
//! modules excepted, which borrow the mock adapters).

pub mod engine;
pub mod storage;
pub mod ui_bridge;
pub mod usb;
