//! Presentation layer: the command-line front end.
//!
//! Argument parsing with clap and plain-text output to stdout; all
//! diagnostics go through `tracing` to stderr.

pub mod cli;

pub use cli::*;
