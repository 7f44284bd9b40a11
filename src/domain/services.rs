//! Expression evaluation services.
//!
//! Formulas never evaluate text themselves; they hand the equation and the
//! symbol bindings to an [`ExpressionEngine`]. The default engine is the
//! recursive descent parser in [`super::parser`], which only understands
//! arithmetic, a fixed set of math functions, and named symbols.

use std::collections::{BTreeSet, HashMap};

use super::errors::EvalResult;
use super::parser::{ExpressionEvaluator, FunctionRegistry, parse_expression};

/// Symbol name to numeric value.
pub type Bindings = HashMap<String, f64>;

/// Capability to evaluate expression text against symbol bindings.
///
/// Symbols absent from the bindings may still resolve to physical
/// constants, depending on the engine.
pub trait ExpressionEngine {
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> EvalResult<f64>;

    /// Symbols the expression refers to, excluding function names.
    fn symbols(&self, expression: &str) -> EvalResult<BTreeSet<String>>;
}

/// Sandboxed evaluator backed by the built-in recursive descent parser.
///
/// # Examples
///
/// ```
/// use formulab::domain::{Bindings, ExpressionEngine, RecursiveDescentEngine};
///
/// let engine = RecursiveDescentEngine::new();
/// let mut bindings = Bindings::new();
/// bindings.insert("x".to_string(), 3.0);
///
/// assert_eq!(engine.evaluate("0.5 * x ** 2", &bindings), Ok(4.5));
/// assert!(engine.evaluate("y + 1", &bindings).is_err());
/// ```
#[derive(Default)]
pub struct RecursiveDescentEngine {
    functions: FunctionRegistry,
}

impl RecursiveDescentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }
}

impl ExpressionEngine for RecursiveDescentEngine {
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> EvalResult<f64> {
        let ast = parse_expression(expression)?;
        ExpressionEvaluator::new(bindings, &self.functions).evaluate(&ast)
    }

    fn symbols(&self, expression: &str) -> EvalResult<BTreeSet<String>> {
        Ok(parse_expression(expression)?.symbols())
    }
}
