//! USB host adapters.
//!
//! The OS-specific USB service is supplied by the embedding platform shell,
//! which implements [`crate::application::permission::UsbHost`] and pushes
//! permission results and detaches onto the event channel.  The `mock`
//! module provides an in-memory host for tests and for running headless.

pub mod mock;
