//! Formula data model and evaluation engine.
//!
//! Domains, variables, formulas, the physical constant registry, and the
//! sandboxed expression evaluator. Nothing in this layer performs I/O.

pub mod constants;
pub mod errors;
pub mod formula;
pub mod models;
pub mod parser;
pub mod services;

pub use constants::*;
pub use errors::*;
pub use formula::*;
pub use models::*;
pub use services::*;
