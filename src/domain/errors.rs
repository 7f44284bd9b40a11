use thiserror::Error;

/// Raised when a `domain_range` string cannot describe an interval.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainParseError {
    #[error("domain range {range:?} must contain exactly two bounds, found {found}")]
    WrongBoundCount { range: String, found: usize },
    #[error("domain range {range:?} has a non-numeric bound {token:?}")]
    InvalidBound { range: String, token: String },
    #[error("integer domain range {range:?} has a non-integral bound {token:?}")]
    NonIntegralBound { range: String, token: String },
    #[error("domain range {range:?} has its lower bound above its upper bound")]
    InvertedBounds { range: String },
    #[error("domain range {range:?} contains no finite value")]
    EmptyInterval { range: String },
}

/// Failures of the expression evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(String),
    #[error("unknown function {0:?}")]
    UnknownFunction(String),
    #[error("{name} expects {expected} argument(s), got {found}")]
    FunctionArity { name: String, expected: String, found: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("math domain error: {0}")]
    MathDomain(String),
    #[error("result is not a finite number")]
    NonFinite,
}

/// Errors raised by formula evaluation and sampling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("expected {expected} value(s), one per independent variable, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("unknown constant {0:?}")]
    UnknownConstant(String),
    #[error("failed to evaluate {equation:?}: {source}")]
    Evaluation {
        equation: String,
        #[source]
        source: EvalError,
    },
    #[error("equation {equation:?} references unbound symbol(s): {}", symbols.join(", "))]
    UnboundSymbols { equation: String, symbols: Vec<String> },
    #[error("equation {equation:?} never uses independent variable(s): {}", symbols.join(", "))]
    UnusedVariables { equation: String, symbols: Vec<String> },
}

pub type DomainResult<T> = Result<T, DomainParseError>;
pub type EvalResult<T> = Result<T, EvalError>;
pub type FormulaResult<T> = Result<T, FormulaError>;
