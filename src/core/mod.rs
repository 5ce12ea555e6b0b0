//! Core data structures for portcfg.
//!
//! This module contains the foundational types used throughout portcfg:
//! - Signals describing a compilation environment
//! - Predefined-macro tables
//! - The catalog of flags, constants and shims
//! - The resolved configuration record

pub mod catalog;
pub mod macros;
pub mod presets;
pub mod resolved;
pub mod signal;

pub use catalog::{CapabilityFlag, DerivedConstant, ShimId, DEFAULT_PREFIX};
pub use macros::MacroTable;
pub use resolved::ResolvedConfig;
pub use signal::Signals;
