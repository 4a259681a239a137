//! Small ndarray-like matrix type used throughout the crate.
//!
//! `Array2` is a dense row-major container with just enough API for
//! row-oriented dataset work: shape checks, row access, and row selection
//! by index.
pub mod matrix;

pub use matrix::{Array2, ShapeError};
