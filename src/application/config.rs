use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::domain::{DEFAULT_INFINITY_BOUND, Formula};

pub const DEFAULT_FORMULAS_FILE: &str = "data/formulae/formulae.json";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Which dataset a batch of generated points belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetTarget {
    Training,
    Testing,
}

impl DatasetTarget {
    pub fn dir_name(&self) -> &'static str {
        match self {
            DatasetTarget::Training => "training_data",
            DatasetTarget::Testing => "testing_data",
        }
    }
}

/// Runtime settings shared by the workflows.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub formulas_file: PathBuf,
    pub data_dir: PathBuf,
    /// Stand-in for infinite domain bounds while sampling.
    pub infinity_bound: f64,
    /// Fixed seed for reproducible datasets; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            formulas_file: PathBuf::from(DEFAULT_FORMULAS_FILE),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            infinity_bound: DEFAULT_INFINITY_BOUND,
            seed: None,
        }
    }
}

impl AppConfig {
    pub fn dataset_dir(&self, target: DatasetTarget) -> PathBuf {
        self.data_dir.join(target.dir_name())
    }

    /// `<data_dir>/<training_data|testing_data>/<canonical name>.csv`
    pub fn dataset_path(&self, formula: &Formula, target: DatasetTarget) -> PathBuf {
        self.dataset_dir(target)
            .join(format!("{}.csv", formula.canonical_file_name()))
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainKind, Variable};
    use rand::Rng;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.formulas_file, Path::new("data/formulae/formulae.json"));
        assert_eq!(config.infinity_bound, 10_000.0);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_dataset_path() {
        let v = Variable::parse("q", "Charge", "C", DomainKind::Real, "[-inf, inf]").unwrap();
        let formula = Formula::new("I.25.13: Capacitance", "q", vec![v.clone()], v);
        let config = AppConfig::default();

        assert_eq!(
            config.dataset_path(&formula, DatasetTarget::Testing),
            Path::new("data/testing_data/I.25.13_Capacitance.csv")
        );
        assert_eq!(
            config.dataset_dir(DatasetTarget::Training),
            Path::new("data/training_data")
        );
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = AppConfig {
            seed: Some(99),
            ..AppConfig::default()
        };
        let a: f64 = config.rng().gen_range(0.0..1.0);
        let b: f64 = config.rng().gen_range(0.0..1.0);
        assert_eq!(a, b);
    }
}
