//! Checks a regressed model against a testing dataset.
//!
//! The model is free text typed by a user, so it only ever reaches the
//! sandboxed expression engine. It is cleaned first: `^` becomes `**`,
//! anything up to an `=` or `≈` is dropped, and physical constants are
//! replaced by their values.

use super::errors::{AppError, AppResult};
use crate::domain::{Bindings, ConstantHandler, ExpressionEngine, RecursiveDescentEngine};
use crate::infrastructure::Dataset;

/// Normalizes a user-entered model for evaluation.
///
/// # Examples
///
/// ```
/// use formulab::application::clean_model;
///
/// assert_eq!(clean_model("y = 2 * x^2"), " 2 * x**2");
/// assert_eq!(clean_model("U ≈ pi * r"), " 3.141592653589793 * r");
/// ```
pub fn clean_model(model: &str) -> String {
    clean_model_keeping(model, &[])
}

/// Like [`clean_model`], but leaves the names in `symbols` alone even when
/// they collide with a constant.
pub fn clean_model_keeping(model: &str, symbols: &[String]) -> String {
    let model = model.replace('^', "**");
    let rhs = rhs_of(rhs_of(&model, '='), '≈');
    ConstantHandler::substitute_except(rhs, symbols)
}

fn rhs_of(text: &str, separator: char) -> &str {
    text.split_once(separator).map_or(text, |(_, rhs)| rhs)
}

/// Goodness of fit of a model over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub expected: Vec<f64>,
    pub fitted: Vec<f64>,
    /// `fitted - expected`, row by row.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Total sum of squares of the expected values around their mean.
    pub sst: f64,
    pub r_squared: f64,
}

pub struct ModelVerifier<E: ExpressionEngine = RecursiveDescentEngine> {
    engine: E,
}

impl ModelVerifier {
    pub fn new() -> Self {
        Self::with_engine(RecursiveDescentEngine::new())
    }
}

impl Default for ModelVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ExpressionEngine> ModelVerifier<E> {
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    /// Evaluates `model` on every row and compares with the dependent column.
    pub fn verify(&self, model: &str, dataset: &Dataset) -> AppResult<VerificationReport> {
        if dataset.rows.is_empty() {
            return Err(AppError::EmptyDataset);
        }

        let symbols = dataset.independent_symbols();
        let cleaned = clean_model_keeping(model, &symbols);

        let mut fitted = Vec::with_capacity(dataset.rows.len());
        for (row_index, row) in dataset.rows.iter().enumerate() {
            if row.len() != dataset.headers.len() {
                return Err(AppError::RaggedRow {
                    row: row_index + 1,
                    expected: dataset.headers.len(),
                    found: row.len(),
                });
            }
            let bindings: Bindings = symbols
                .iter()
                .cloned()
                .zip(row.iter().skip(1).copied())
                .collect();
            let value = self
                .engine
                .evaluate(&cleaned, &bindings)
                .map_err(|source| AppError::ModelEvaluation {
                    model: cleaned.clone(),
                    row: row_index + 1,
                    source,
                })?;
            fitted.push(value);
        }

        let expected = dataset.dependent_values();
        let residuals: Vec<f64> = fitted
            .iter()
            .zip(&expected)
            .map(|(fit, exp)| fit - exp)
            .collect();

        let ssr: f64 = residuals.iter().map(|r| r * r).sum();
        let mean = expected.iter().sum::<f64>() / expected.len() as f64;
        let sst: f64 = expected.iter().map(|y| (y - mean).powi(2)).sum();
        if sst == 0.0 {
            return Err(AppError::DegenerateDataset);
        }

        Ok(VerificationReport {
            r_squared: 1.0 - ssr / sst,
            expected,
            fitted,
            residuals,
            ssr,
            sst,
        })
    }
}
