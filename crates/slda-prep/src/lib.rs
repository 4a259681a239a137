//! slda-prep: dataset preparation for supervised LDA estimators.
//!
//! This crate turns sample-by-feature count matrices (typically OTU tables)
//! and categorical labels into the sparse bag-of-counts text format read by
//! the external `slda` estimator, optionally partitioned into stratified
//! cross-validation folds. It also wraps the estimator binary itself so a
//! model can be fit and applied from Rust.
//!
//! File formats live under `io`; the estimator subprocess runs behind the
//! `estimator::CommandRunner` trait.
pub mod config;
pub mod cross_validation;
pub mod data_handling;
pub mod error;
pub mod estimator;
pub mod io;
pub mod label_encoder;
pub mod math;

pub use error::PrepError;
