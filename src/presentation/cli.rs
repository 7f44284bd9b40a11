use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::{
    App, AppConfig, AppResult, DEFAULT_DATA_DIR, DEFAULT_FORMULAS_FILE, DatasetTarget,
};
use crate::domain::{ConstantHandler, DEFAULT_INFINITY_BOUND, Formula, InputValue};

/// Physics formula library: evaluate formulas, generate datasets, verify regressed models
#[derive(Debug, Parser)]
#[command(name = "formulab")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON file holding the formula definitions
    #[arg(long, global = true, env = "FORMULAB_FORMULAS", default_value = DEFAULT_FORMULAS_FILE)]
    pub formulas: PathBuf,

    /// Directory holding training_data/ and testing_data/
    #[arg(long, global = true, env = "FORMULAB_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Value substituted for infinite domain bounds when sampling
    #[arg(long, global = true, default_value_t = DEFAULT_INFINITY_BOUND, value_parser = parse_infinity_bound)]
    pub infinity_bound: f64,

    /// Seed for reproducible sampling
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List stored formulas
    List,
    /// Show a formula and its variables
    Show { name: String },
    /// Evaluate a formula; values may be numbers or constant names such as `pi`
    Eval {
        name: String,
        #[arg(allow_negative_numbers = true)]
        values: Vec<String>,
    },
    /// Append random data points to a formula's dataset
    Generate {
        name: String,
        count: usize,
        /// Write to testing_data instead of training_data
        #[arg(long)]
        testing: bool,
    },
    /// Score a regressed model against a formula's testing dataset
    Verify { name: String, model: String },
    /// Replace whole-token physical constant names in text with their values
    Substitute { text: String },
    /// Store the spring-potential and capacitance sample formulas
    AddDefaults,
}

impl Cli {
    pub fn config(&self) -> AppConfig {
        AppConfig {
            formulas_file: self.formulas.clone(),
            data_dir: self.data_dir.clone(),
            infinity_bound: self.infinity_bound,
            seed: self.seed,
        }
    }
}

/// A positive finite number.
fn parse_infinity_bound(text: &str) -> Result<f64, String> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        Ok(value) => Err(format!("{value} is not a positive finite number")),
        Err(e) => Err(e.to_string()),
    }
}

/// Executes the parsed command, writing results to stdout.
pub fn run(cli: Cli) -> AppResult<()> {
    let config = cli.config();

    match cli.command {
        Commands::Substitute { text } => println!("{}", ConstantHandler::substitute(&text)),
        command => run_with_store(command, App::open(config)?)?,
    }

    Ok(())
}

fn run_with_store(command: Commands, mut app: App) -> AppResult<()> {
    match command {
        Commands::List => {
            for formula in app.store.formulas() {
                println!("{formula}");
            }
        }
        Commands::Show { name } => print_formula(app.formula(&name)?),
        Commands::Eval { name, values } => {
            let values: Vec<InputValue> = values.into_iter().map(InputValue::from).collect();
            let formula = app.formula(&name)?;
            let result = formula.evaluate_at(&values)?;
            println!("{} = {}", formula.dependent_variable.label(), result);
        }
        Commands::Generate {
            name,
            count,
            testing,
        } => {
            let target = if testing {
                DatasetTarget::Testing
            } else {
                DatasetTarget::Training
            };
            let mut rng = app.config.rng();
            let rows = app.generate(&name, count, target, &mut rng)?;
            let path = app.config.dataset_path(app.formula(&name)?, target);
            println!("wrote {} rows to {}", rows.len(), path.display());
        }
        Commands::Verify { name, model } => {
            let report = app.verify(&name, &model)?;
            println!("rows: {}", report.expected.len());
            println!("SSR: {}", report.ssr);
            println!("SST: {}", report.sst);
            println!("R-squared: {}", report.r_squared);
        }
        Commands::AddDefaults => {
            let added = app.add_sample_formulas()?;
            println!("added {added} formula(s) to {}", app.store.path().display());
        }
        Commands::Substitute { text } => println!("{}", ConstantHandler::substitute(&text)),
    }

    Ok(())
}

fn print_formula(formula: &Formula) {
    println!("{formula}");
    println!("  {} = {}", formula.dependent_variable.label(), formula.equation);
    for variable in &formula.independent_variables {
        println!(
            "  {:<16} {:<24} {} {}",
            variable.label(),
            variable.name,
            variable.domain.kind(),
            variable.domain.range_string()
        );
    }
    println!("  file stem: {}", formula.canonical_file_name());
}
