//! formulab - physics formula library
//!
//! Typed physical formulas over bounded variables: sample inputs within
//! their declared domains, evaluate equations with physical constants in
//! a sandboxed expression evaluator, persist formula definitions, and
//! generate or verify regression datasets.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::{
    ConstantHandler, Domain, DomainKind, DomainParseError, EvalError, ExpressionEngine, Formula,
    FormulaError, InputValue, RecursiveDescentEngine, Variable,
};
pub use application::{App, AppConfig, AppError, DatasetTarget, DataGenerator, ModelVerifier};
pub use infrastructure::{DatasetFile, FormulaStore, StoreError};
