//! Library side of the `slda-prep-cli` binary: argument handling and the
//! `convert`, `est` and `inf` workflows, kept here so they can be tested
//! without spawning the binary.
pub mod commands;
