//! High-level operations.
//!
//! This module contains the implementation of portcfg commands that are
//! more than a single negotiation.

pub mod matrix;

pub use matrix::{format_report, run_matrix, Matrix, MatrixReport};
