//! Application layer use cases for the M8 host.
//!
//! # What use cases does the host have?
//!
//! - **`session`** – The Session Controller: the state machine that takes a
//!   device from discovery through permission and connection to active use,
//!   and back to idle on detach.
//!
//! - **`permission`** – The Permission Broker: requests OS authorisation for
//!   one device and filters out results that belong to a stale attachment.
//!
//! - **`input`** – The Input Mapper: turns touches on named UI controls into
//!   M8 key events for the engine.
//!
//! - **`command_bridge`** – The Command Bridge: decodes commands pushed by
//!   the engine and applies their host-side effects.
//!
//! - **`events`** – The single inbound event channel and the dispatch loop
//!   that feeds it into the Session Controller.
//!
//! The outbound traits (`UsbHost`, `EngineConnection`, `HostSurface`,
//! `PreferenceStore`) are declared next to the use case that needs them and
//! implemented in the infrastructure layer, so every use case is fully
//! unit-testable with the mock adapters.

pub mod command_bridge;
pub mod events;
pub mod input;
pub mod permission;
pub mod session;
