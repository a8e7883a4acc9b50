//! Protocol module: values crossing the host/engine boundary.
//!
//! - [`command`] – tagged commands pushed *from* the engine to the host.
//! - [`controller`] – key state pushed *from* the host to the device.

pub mod command;
pub mod controller;

pub use command::{decode_command, encode_command, EngineCommand, Rgb, BACKGROUND_COLOR_CHANGED};
pub use controller::{decode_controller_message, encode_controller_message, KeyMask, ProtocolError};
