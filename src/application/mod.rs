//! Application layer coordinating formulas, datasets, and verification.
//!
//! These workflows stand between the domain model and the command-line
//! front end: generating training and testing datasets, and scoring
//! regressed models against them.

pub mod config;
pub mod errors;
pub mod generator;
pub mod state;
pub mod verifier;

pub use config::*;
pub use errors::*;
pub use generator::*;
pub use state::*;
pub use verifier::*;
