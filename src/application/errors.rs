use thiserror::Error;

use crate::domain::{DomainParseError, EvalError, FormulaError};
use crate::infrastructure::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainParseError),
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no formula named {0:?}")]
    FormulaNotFound(String),
    #[error("cannot evaluate model {model:?} on row {row}: {source}")]
    ModelEvaluation {
        model: String,
        row: usize,
        #[source]
        source: EvalError,
    },
    #[error("dataset row {row} has {found} values for {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("dataset has no rows")]
    EmptyDataset,
    #[error("dependent values are all equal, R² is undefined")]
    DegenerateDataset,
}

pub type AppResult<T> = Result<T, AppError>;
