//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate directory
//!   (or an explicit `--config` path).
//! - Writing it back when the user changes preferences.
//! - Providing defaults when the file does not exist yet (first run).
//! - Serving the user's preferences to the session as a [`PreferenceStore`]
//!   snapshot.
//!
//! [`PreferenceStore`]: crate::application::session::PreferenceStore

pub mod config;
