//! Application state tying the formula store to the workflows.

use rand::Rng;
use tracing::info;

use super::config::{AppConfig, DatasetTarget};
use super::errors::{AppError, AppResult};
use super::generator::DataGenerator;
use super::verifier::{ModelVerifier, VerificationReport};
use crate::domain::{DomainKind, Formula, InputValue, Variable};
use crate::infrastructure::{DatasetFile, FormulaStore};

/// Loaded formulas plus the settings used to generate and verify datasets.
///
/// # Examples
///
/// ```no_run
/// use formulab::application::{App, AppConfig};
///
/// let app = App::open(AppConfig::default()).unwrap();
/// for formula in app.store.formulas() {
///     println!("{formula}");
/// }
/// ```
#[derive(Debug)]
pub struct App {
    pub config: AppConfig,
    pub store: FormulaStore,
}

impl App {
    pub fn open(config: AppConfig) -> AppResult<Self> {
        let store = FormulaStore::open(&config.formulas_file)?;
        Ok(Self { config, store })
    }

    pub fn formula(&self, name: &str) -> AppResult<&Formula> {
        self.store
            .find_by_name(name)
            .ok_or_else(|| AppError::FormulaNotFound(name.to_string()))
    }

    pub fn evaluate(&self, name: &str, values: &[InputValue]) -> AppResult<f64> {
        Ok(self.formula(name)?.evaluate_at(values)?)
    }

    /// Generates `count` points for the named formula into its training or testing dataset.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        name: &str,
        count: usize,
        target: DatasetTarget,
        rng: &mut R,
    ) -> AppResult<Vec<Vec<f64>>> {
        let formula = self.formula(name)?;
        let path = self.config.dataset_path(formula, target);
        DataGenerator::new(self.config.infinity_bound).generate_to_file(formula, count, &path, rng)
    }

    /// Scores a regressed model against the named formula's testing dataset.
    pub fn verify(&self, name: &str, model: &str) -> AppResult<VerificationReport> {
        let formula = self.formula(name)?;
        let path = self.config.dataset_path(formula, DatasetTarget::Testing);
        let dataset = DatasetFile::read(&path)?;
        ModelVerifier::new().verify(model, &dataset)
    }

    /// Stores the sample formulas; already stored ones are left as they are.
    ///
    /// Returns how many were newly added.
    pub fn add_sample_formulas(&mut self) -> AppResult<usize> {
        let mut added = 0;
        for formula in sample_formulas()? {
            formula.validate()?;
            if self.store.add(formula)? {
                added += 1;
            }
        }
        info!(added, path = %self.store.path().display(), "sample formulas stored");
        Ok(added)
    }
}

/// Spring potential energy and capacitor voltage, from the Feynman lectures.
pub fn sample_formulas() -> AppResult<Vec<Formula>> {
    let real = |symbol: &str, name: &str, unit: &str, range: &str| {
        Variable::parse(symbol, name, unit, DomainKind::Real, range)
    };

    Ok(vec![
        Formula::new(
            "I.14.4: Potential Energy of a Spring",
            "0.5 * k_spring * x ** 2",
            vec![
                real("k_spring", "Spring constant", "N/m", "[0, inf]")?,
                real("x", "Displacement", "m", "[-inf, inf]")?,
            ],
            real("U", "Potential energy", "J", "[-inf, inf]")?,
        ),
        Formula::new(
            "I.25.13: Capacitance",
            "q / C",
            vec![
                real("q", "Charge", "C", "[-inf, inf]")?,
                real("C", "Capacitance", "F", "[0, inf]")?,
            ],
            real("V_epsilon", "Electric potential", "V", "[-inf, inf]")?,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let config = AppConfig {
            formulas_file: dir.path().join("formulae").join("formulae.json"),
            data_dir: dir.path().join("data"),
            infinity_bound: 50.0,
            seed: Some(3),
        };
        App::open(config).unwrap()
    }

    #[test]
    fn test_open_empty_store() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        assert!(app.store.formulas().is_empty());
        assert!(matches!(app.formula("missing"), Err(AppError::FormulaNotFound(_))));
    }

    #[test]
    fn test_add_sample_formulas_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        assert_eq!(app.add_sample_formulas().unwrap(), 2);
        assert_eq!(app.add_sample_formulas().unwrap(), 0);
        assert_eq!(test_app(&dir).store.formulas().len(), 2);
    }

    #[test]
    fn test_evaluate_by_name() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.add_sample_formulas().unwrap();

        let value = app
            .evaluate("I.14.4: Potential Energy of a Spring", &InputValue::numbers(&[2.0, 3.0]))
            .unwrap();
        assert_eq!(value, 9.0);
    }

    #[test]
    fn test_generate_then_verify() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.add_sample_formulas().unwrap();
        let mut rng = StdRng::seed_from_u64(12);

        let name = "I.14.4: Potential Energy of a Spring";
        let rows = app.generate(name, 25, DatasetTarget::Testing, &mut rng).unwrap();
        assert_eq!(rows.len(), 25);
        assert!(dir
            .path()
            .join("data/testing_data/I.14.4_Potential_Energy_of_a_Spring.csv")
            .exists());

        let report = app.verify(name, "U = 0.5 * k_spring * x^2").unwrap();
        assert!((report.r_squared - 1.0).abs() < 1e-9);

        let report = app.verify(name, "k_spring * x").unwrap();
        assert!(report.r_squared < 1.0);
    }

    #[test]
    fn test_verify_without_dataset_fails() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.add_sample_formulas().unwrap();

        assert!(matches!(
            app.verify("I.25.13: Capacitance", "q / C"),
            Err(AppError::Store(_))
        ));
    }
}
