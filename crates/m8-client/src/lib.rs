//! m8-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does m8-client do? (for beginners)
//!
//! The *client* is the host side of a headless M8: the app that finds the
//! device, asks the OS for permission to use it, starts the engine that talks
//! to it, and then shuttles input and display state back and forth.
//!
//! 1. Scans the USB device list for an M8 when the user presses *start*.
//! 2. Asks the OS for permission if the app is not yet authorised.
//! 3. Starts the engine connection with the user's audio preferences.
//! 4. Translates touches on the on-screen buttons into M8 key events.
//! 5. Applies commands pushed by the engine (e.g. background colour changes).
//! 6. Tears everything down when the device is unplugged.
//!
//! Every OS callback, engine callback, and UI action is delivered as a
//! [`application::events::HostEvent`] on one channel and applied by one task,
//! so session state is never mutated concurrently.

/// Application layer: session lifecycle and bridge use cases.
pub mod application;

/// Infrastructure layer: USB, engine, UI and storage adapters.
pub mod infrastructure;
