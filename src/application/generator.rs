//! Random dataset generation for a formula.

use std::path::Path;

use rand::Rng;
use tracing::info;

use super::errors::AppResult;
use crate::domain::{ExpressionEngine, Formula, FormulaResult, RecursiveDescentEngine};
use crate::infrastructure::DatasetFile;

/// Produces rows of `[dependent, independent...]` values by sampling each
/// independent variable's domain.
pub struct DataGenerator<E: ExpressionEngine = RecursiveDescentEngine> {
    engine: E,
    infinity_bound: f64,
}

impl DataGenerator {
    pub fn new(infinity_bound: f64) -> Self {
        Self::with_engine(RecursiveDescentEngine::new(), infinity_bound)
    }
}

impl<E: ExpressionEngine> DataGenerator<E> {
    pub fn with_engine(engine: E, infinity_bound: f64) -> Self {
        Self {
            engine,
            infinity_bound,
        }
    }

    /// Generates exactly `count` rows, sorted by the dependent value ascending.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        formula: &Formula,
        count: usize,
        rng: &mut R,
    ) -> FormulaResult<Vec<Vec<f64>>> {
        let mut rows = (0..count)
            .map(|_| formula.generate_random_data_point_with(&self.engine, rng, self.infinity_bound))
            .collect::<FormulaResult<Vec<_>>>()?;
        rows.sort_by(|a, b| a[0].total_cmp(&b[0]));
        Ok(rows)
    }

    /// Generates `count` rows and appends them to the dataset at `path`.
    pub fn generate_to_file<R: Rng + ?Sized>(
        &self,
        formula: &Formula,
        count: usize,
        path: &Path,
        rng: &mut R,
    ) -> AppResult<Vec<Vec<f64>>> {
        let rows = self.generate(formula, count, rng)?;
        DatasetFile::append(path, &formula.variable_labels(), &rows)?;
        info!(formula = %formula.name, rows = rows.len(), path = %path.display(), "generated dataset");
        Ok(rows)
    }
}
