//! portcfg - Build-time capability negotiation for portable C++ libraries
//!
//! This crate turns a description of a compilation environment (compiler,
//! target, standard library, language level, build switches) into one
//! immutable configuration: capability flags, derived constants and
//! portable attribute shims, rendered as a C/C++ header or JSON.

pub mod core;
pub mod emit;
pub mod negotiate;
pub mod ops;
pub mod util;

pub use crate::core::{
    catalog::CapabilityFlag, catalog::DerivedConstant, catalog::ShimId,
    resolved::ResolvedConfig, signal::Signals,
};

pub use negotiate::{negotiate, NegotiationError, Negotiator};
