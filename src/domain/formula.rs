use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::constants::ConstantHandler;
use super::errors::{FormulaError, FormulaResult};
use super::models::Variable;
use super::services::{Bindings, ExpressionEngine, RecursiveDescentEngine};

/// A value supplied for an independent variable: a number, or the name of a physical constant.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Number(f64),
    Constant(String),
}

impl InputValue {
    pub fn numbers(values: &[f64]) -> Vec<InputValue> {
        values.iter().copied().map(InputValue::Number).collect()
    }

    /// Resolves constant names through the constant registry.
    pub fn resolve(&self) -> FormulaResult<f64> {
        match self {
            InputValue::Number(value) => Ok(*value),
            InputValue::Constant(name) => ConstantHandler::value(name)
                .ok_or_else(|| FormulaError::UnknownConstant(name.clone())),
        }
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Number(value)
    }
}

/// Numeric text becomes a number; anything else is taken as a constant name.
impl From<&str> for InputValue {
    fn from(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(value) => InputValue::Number(value),
            Err(_) => InputValue::Constant(text.trim().to_string()),
        }
    }
}

impl From<String> for InputValue {
    fn from(text: String) -> Self {
        InputValue::from(text.as_str())
    }
}

/// A named physical law: an equation over ordered independent variables.
///
/// Identity is `(name, equation)`; the variable lists take no part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    pub equation: String,
    pub independent_variables: Vec<Variable>,
    pub dependent_variable: Variable,
}

impl Formula {
    pub fn new(
        name: impl Into<String>,
        equation: impl Into<String>,
        independent_variables: Vec<Variable>,
        dependent_variable: Variable,
    ) -> Self {
        Self {
            name: name.into(),
            equation: equation.into(),
            independent_variables,
            dependent_variable,
        }
    }

    /// Evaluates the equation with `values` bound positionally to the independent variables.
    ///
    /// # Examples
    ///
    /// ```
    /// use formulab::domain::{DomainKind, Formula, InputValue, Variable};
    ///
    /// let k = Variable::parse("k", "Spring constant", "N/m", DomainKind::Real, "[0, inf]").unwrap();
    /// let x = Variable::parse("x", "Displacement", "m", DomainKind::Real, "[-inf, inf]").unwrap();
    /// let u = Variable::parse("U", "Potential energy", "J", DomainKind::Real, "[-inf, inf]").unwrap();
    /// let spring = Formula::new("spring", "0.5 * k * x ** 2", vec![k, x], u);
    ///
    /// assert_eq!(spring.evaluate_at(&InputValue::numbers(&[2.0, 3.0])).unwrap(), 9.0);
    /// ```
    pub fn evaluate_at(&self, values: &[InputValue]) -> FormulaResult<f64> {
        self.evaluate_at_with(&RecursiveDescentEngine::new(), values)
    }

    pub fn evaluate_at_with(
        &self,
        engine: &dyn ExpressionEngine,
        values: &[InputValue],
    ) -> FormulaResult<f64> {
        let bindings = self.bindings(values)?;
        engine
            .evaluate(&self.equation, &bindings)
            .map_err(|source| FormulaError::Evaluation {
                equation: self.equation.clone(),
                source,
            })
    }

    /// Zips the independent variable symbols with the resolved values.
    pub fn bindings(&self, values: &[InputValue]) -> FormulaResult<Bindings> {
        if values.len() != self.independent_variables.len() {
            return Err(FormulaError::Arity {
                expected: self.independent_variables.len(),
                found: values.len(),
            });
        }

        let mut bindings = Bindings::with_capacity(values.len());
        for (variable, value) in self.independent_variables.iter().zip(values) {
            bindings.insert(variable.symbol.clone(), value.resolve()?);
        }
        Ok(bindings)
    }

    /// Samples every independent variable and evaluates the equation there.
    ///
    /// Returns `[dependent, independent_1, ..., independent_k]` in declared order.
    pub fn generate_random_data_point<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        infinity_bound: f64,
    ) -> FormulaResult<Vec<f64>> {
        self.generate_random_data_point_with(&RecursiveDescentEngine::new(), rng, infinity_bound)
    }

    pub fn generate_random_data_point_with<R: Rng + ?Sized>(
        &self,
        engine: &dyn ExpressionEngine,
        rng: &mut R,
        infinity_bound: f64,
    ) -> FormulaResult<Vec<f64>> {
        let samples: Vec<f64> = self
            .independent_variables
            .iter()
            .map(|variable| variable.domain.sample(rng, infinity_bound))
            .collect();

        let dependent = self.evaluate_at_with(engine, &InputValue::numbers(&samples))?;

        let mut point = Vec::with_capacity(samples.len() + 1);
        point.push(dependent);
        point.extend(samples);
        Ok(point)
    }

    /// Column headers: the dependent variable first, then each independent variable.
    pub fn variable_labels(&self) -> Vec<String> {
        std::iter::once(&self.dependent_variable)
            .chain(&self.independent_variables)
            .map(Variable::label)
            .collect()
    }

    /// Name usable as a file stem: spaces become underscores and colons are dropped.
    pub fn canonical_file_name(&self) -> String {
        self.name.replace(' ', "_").replace(':', "")
    }

    /// Checks that the equation parses and uses exactly the independent
    /// symbols, plus any physical constants not shadowed by a variable.
    pub fn validate_with(&self, engine: &dyn ExpressionEngine) -> FormulaResult<()> {
        let referenced = engine
            .symbols(&self.equation)
            .map_err(|source| FormulaError::Evaluation {
                equation: self.equation.clone(),
                source,
            })?;

        let declared: Vec<&str> = self
            .independent_variables
            .iter()
            .map(|variable| variable.symbol.as_str())
            .collect();

        let unbound: Vec<String> = referenced
            .iter()
            .filter(|symbol| !declared.contains(&symbol.as_str()))
            .filter(|symbol| !ConstantHandler::is_constant(symbol))
            .cloned()
            .collect();
        if !unbound.is_empty() {
            return Err(FormulaError::UnboundSymbols {
                equation: self.equation.clone(),
                symbols: unbound,
            });
        }

        let unused: Vec<String> = declared
            .iter()
            .filter(|symbol| !referenced.contains(**symbol))
            .map(|symbol| symbol.to_string())
            .collect();
        if !unused.is_empty() {
            return Err(FormulaError::UnusedVariables {
                equation: self.equation.clone(),
                symbols: unused,
            });
        }

        Ok(())
    }

    pub fn validate(&self) -> FormulaResult<()> {
        self.validate_with(&RecursiveDescentEngine::new())
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.equation == other.equation
    }
}

impl Eq for Formula {}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.equation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Domain, DomainKind, EvalError};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn real(symbol: &str, name: &str, unit: &str, range: &str) -> Variable {
        Variable::parse(symbol, name, unit, DomainKind::Real, range).unwrap()
    }

    fn spring() -> Formula {
        Formula::new(
            "I.14.4: Potential Energy of a Spring",
            "0.5 * k_spring * x ** 2",
            vec![
                real("k_spring", "Spring constant", "N/m", "[0, inf]"),
                real("x", "Displacement", "m", "[-inf, inf]"),
            ],
            real("U", "Potential energy", "J", "[-inf, inf]"),
        )
    }

    fn capacitance() -> Formula {
        Formula::new(
            "I.25.13: Capacitance",
            "q / C",
            vec![
                real("q", "Charge", "C", "[-inf, inf]"),
                real("C", "Capacitance", "F", "[0, inf]"),
            ],
            real("V_epsilon", "Electric potential", "V", "[-inf, inf]"),
        )
    }

    struct FixedEngine(f64);

    impl ExpressionEngine for FixedEngine {
        fn evaluate(&self, _expression: &str, bindings: &Bindings) -> Result<f64, EvalError> {
            Ok(self.0 + bindings.len() as f64)
        }

        fn symbols(&self, _expression: &str) -> Result<BTreeSet<String>, EvalError> {
            Ok(BTreeSet::new())
        }
    }

    #[test]
    fn test_evaluate_at() {
        assert_eq!(spring().evaluate_at(&InputValue::numbers(&[2.0, 3.0])).unwrap(), 9.0);
        assert_eq!(capacitance().evaluate_at(&InputValue::numbers(&[4.0, 2.0])).unwrap(), 2.0);
    }

    #[test]
    fn test_evaluate_at_arity() {
        assert_eq!(
            spring().evaluate_at(&InputValue::numbers(&[2.0])),
            Err(FormulaError::Arity { expected: 2, found: 1 })
        );
        assert_eq!(
            spring().evaluate_at(&InputValue::numbers(&[1.0, 2.0, 3.0])),
            Err(FormulaError::Arity { expected: 2, found: 3 })
        );
    }

    #[test]
    fn test_evaluate_at_resolves_constant_inputs() {
        let circle = Formula::new(
            "circle",
            "a * r ** 2",
            vec![real("a", "Factor", "1", "[0, inf]"), real("r", "Radius", "m", "[0, inf]")],
            real("A", "Area", "m^2", "[0, inf]"),
        );
        let area = circle.evaluate_at(&["pi".into(), InputValue::Number(2.0)]).unwrap();
        assert_eq!(area, std::f64::consts::PI * 4.0);

        assert_eq!(
            circle.evaluate_at(&["tau".into(), InputValue::Number(2.0)]),
            Err(FormulaError::UnknownConstant("tau".to_string()))
        );
    }

    #[test]
    fn test_evaluation_error_carries_cause() {
        let err = capacitance().evaluate_at(&InputValue::numbers(&[1.0, 0.0])).unwrap_err();
        match err {
            FormulaError::Evaluation { equation, source } => {
                assert_eq!(equation, "q / C");
                assert_eq!(source, EvalError::DivisionByZero);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_variables_shadow_constants() {
        let boltzmann_free = Formula::new(
            "spring",
            "0.5 * k * x ** 2",
            vec![real("k", "Spring constant", "N/m", "[0, inf]"), real("x", "Displacement", "m", "[-inf, inf]")],
            real("U", "Potential energy", "J", "[-inf, inf]"),
        );
        assert_eq!(boltzmann_free.evaluate_at(&InputValue::numbers(&[2.0, 3.0])).unwrap(), 9.0);
    }

    #[test]
    fn test_generate_random_data_point_shape() {
        let formula = spring();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let point = formula.generate_random_data_point(&mut rng, 100.0).unwrap();
            assert_eq!(point.len(), 3);
            let (k, x) = (point[1], point[2]);
            assert!((0.0..=100.0).contains(&k));
            assert!((-100.0..=100.0).contains(&x));
            assert!((point[0] - 0.5 * k * x.powf(2.0)).abs() <= 1e-9 * point[0].abs().max(1.0));
        }
    }

    #[test]
    fn test_generate_random_data_point_is_deterministic_per_seed() {
        let formula = capacitance();
        let first = formula
            .generate_random_data_point(&mut StdRng::seed_from_u64(1), 10.0)
            .unwrap();
        let second = formula
            .generate_random_data_point(&mut StdRng::seed_from_u64(1), 10.0)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_with_injected_engine() {
        let mut rng = StdRng::seed_from_u64(0);
        let point = spring()
            .generate_random_data_point_with(&FixedEngine(40.0), &mut rng, 5.0)
            .unwrap();
        assert_eq!(point[0], 42.0);
    }

    #[test]
    fn test_integer_variables_sample_integers() {
        let formula = Formula::new(
            "levels",
            "n ** 2",
            vec![Variable::new("n", "Level", "1", Domain::integer(1.0, 6.0).unwrap())],
            real("E", "Energy", "J", "[0, inf]"),
        );
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..50 {
            let point = formula.generate_random_data_point(&mut rng, 10.0).unwrap();
            assert_eq!(point[1].fract(), 0.0);
            assert_eq!(point[0], point[1] * point[1]);
        }
    }

    #[test]
    fn test_variable_labels() {
        assert_eq!(spring().variable_labels(), vec!["U (J)", "k_spring (N/m)", "x (m)"]);
    }

    #[test]
    fn test_canonical_file_name() {
        assert_eq!(spring().canonical_file_name(), "I.14.4_Potential_Energy_of_a_Spring");
        assert_eq!(capacitance().canonical_file_name(), "I.25.13_Capacitance");
    }

    #[test]
    fn test_equality_ignores_variables() {
        let mut other = spring();
        other.independent_variables.pop();
        other.dependent_variable = real("E", "Energy", "J", "[0, inf]");

        assert_eq!(spring(), spring());
        assert_eq!(spring(), other);
        assert_eq!(other, spring());
        assert_ne!(spring(), capacitance());

        let mut renamed = spring();
        renamed.equation = "k_spring * x ** 2 / 2".to_string();
        assert_ne!(spring(), renamed);
    }

    #[test]
    fn test_validate() {
        assert!(spring().validate().is_ok());
        assert!(capacitance().validate().is_ok());

        let mut unbound = capacitance();
        unbound.equation = "q / C + t".to_string();
        assert_eq!(
            unbound.validate(),
            Err(FormulaError::UnboundSymbols {
                equation: "q / C + t".to_string(),
                symbols: vec!["t".to_string()],
            })
        );

        let mut unused = capacitance();
        unused.equation = "q * c".to_string();
        assert!(matches!(unused.validate(), Err(FormulaError::UnusedVariables { .. })));
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(capacitance()).unwrap();
        assert_eq!(value["name"], "I.25.13: Capacitance");
        assert_eq!(value["independent_variables"][1]["domain_range"], "[0, inf]");
        assert_eq!(value["dependent_variable"]["symbol"], "V_epsilon");

        let back: Formula = serde_json::from_value(value).unwrap();
        assert_eq!(back.independent_variables, capacitance().independent_variables);
    }
}
