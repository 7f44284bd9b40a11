//! Infrastructure layer providing file persistence.
//!
//! Formula definitions live in a JSON file; generated datasets are CSV
//! files named after their formula.

pub mod dataset;
pub mod errors;
pub mod persistence;

pub use dataset::*;
pub use errors::*;
pub use persistence::*;
