//! Domain entities for the M8 host.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from OS APIs, USB libraries, or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Code in outer layers (application, infrastructure) depends on the domain,
//! but the domain never depends on them.

/// USB device descriptors and the M8 hardware allow-list.
pub mod device;

/// Immutable snapshot of the user's preferences.
pub mod preferences;

/// Device session states and user-visible outcomes.
pub mod session;
