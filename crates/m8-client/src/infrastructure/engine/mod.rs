//! Engine connection adapters.
//!
//! - `serial` – writes key state to any byte sink as controller messages.
//! - `mock` – records every call in memory for tests.

pub mod mock;
pub mod serial;

pub use serial::SerialEngine;
