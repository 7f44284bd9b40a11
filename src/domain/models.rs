use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::errors::{DomainParseError, DomainResult};

/// Substitute for an infinite bound when drawing samples.
pub const DEFAULT_INFINITY_BOUND: f64 = 10_000.0;

/// Kind of values a [`Domain`] admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainKind {
    Real,
    Integer,
}

impl DomainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::Real => "real",
            DomainKind::Integer => "integer",
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed interval of legal values for a variable.
///
/// Either bound may be infinite, but the interval must hold a finite
/// value. Integer domains only admit integral values, and their finite
/// bounds must be integral as well.
#[derive(Debug, Clone)]
pub struct Domain {
    kind: DomainKind,
    lower: f64,
    upper: f64,
    /// Range text as written, when parsed from one.
    declared: Option<String>,
}

impl Domain {
    /// Creates a domain, rejecting NaN, inverted, empty, or (for integers) fractional bounds.
    pub fn new(kind: DomainKind, lower: f64, upper: f64) -> DomainResult<Self> {
        Self::checked(kind, lower, upper, None)
    }

    pub fn real(lower: f64, upper: f64) -> DomainResult<Self> {
        Self::new(DomainKind::Real, lower, upper)
    }

    pub fn integer(lower: f64, upper: f64) -> DomainResult<Self> {
        Self::new(DomainKind::Integer, lower, upper)
    }

    /// Parses a bracketed range such as `[0, inf]` or `[-inf, inf]`.
    pub fn parse(kind: DomainKind, range: &str) -> DomainResult<Self> {
        let inner = range.trim().trim_matches(|c| c == '[' || c == ']');
        let tokens: Vec<&str> = inner.split(',').map(str::trim).collect();
        if tokens.len() != 2 {
            return Err(DomainParseError::WrongBoundCount {
                range: range.to_string(),
                found: tokens.len(),
            });
        }

        let mut bounds = [0.0; 2];
        for (slot, token) in bounds.iter_mut().zip(&tokens) {
            *slot = token
                .parse::<f64>()
                .ok()
                .filter(|v| !v.is_nan())
                .ok_or_else(|| DomainParseError::InvalidBound {
                    range: range.to_string(),
                    token: token.to_string(),
                })?;
        }

        Self::checked(kind, bounds[0], bounds[1], Some(range.trim()))
    }

    fn checked(
        kind: DomainKind,
        lower: f64,
        upper: f64,
        declared: Option<&str>,
    ) -> DomainResult<Self> {
        let range = || declared.map_or_else(|| format!("[{lower}, {upper}]"), str::to_string);

        for bound in [lower, upper] {
            if bound.is_nan() {
                return Err(DomainParseError::InvalidBound {
                    range: range(),
                    token: bound.to_string(),
                });
            }
            if kind == DomainKind::Integer && bound.is_finite() && bound.fract() != 0.0 {
                return Err(DomainParseError::NonIntegralBound {
                    range: range(),
                    token: bound.to_string(),
                });
            }
        }
        if lower > upper {
            return Err(DomainParseError::InvertedBounds { range: range() });
        }
        if lower == f64::INFINITY || upper == f64::NEG_INFINITY {
            return Err(DomainParseError::EmptyInterval { range: range() });
        }

        Ok(Self {
            kind,
            lower,
            upper,
            declared: declared.map(str::to_string),
        })
    }

    pub fn kind(&self) -> DomainKind {
        self.kind
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper
    }

    /// The range as written when parsed, otherwise the bounds rendered in
    /// the `[lower, upper]` form accepted by [`Domain::parse`].
    pub fn range_string(&self) -> String {
        self.declared
            .clone()
            .unwrap_or_else(|| format!("[{}, {}]", self.lower, self.upper))
    }

    pub fn is_valid(&self, value: f64) -> bool {
        if self.kind == DomainKind::Integer && !(value.is_finite() && value.fract() == 0.0) {
            return false;
        }
        self.lower <= value && value <= self.upper
    }

    /// Draws a uniform sample, replacing infinite bounds by `±infinity_bound`.
    ///
    /// Infinity is detected on the declared bounds before any integer
    /// conversion. When a finite bound lies beyond the substitute, the
    /// substituted end collapses onto the finite one. A NaN substitute
    /// means [`DEFAULT_INFINITY_BOUND`]; an infinite one means `f64::MAX`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, infinity_bound: f64) -> f64 {
        let (lower, upper) = self.sampling_bounds(infinity_bound);
        match self.kind {
            DomainKind::Real => uniform(rng, lower, upper),
            DomainKind::Integer => {
                let low = lower.ceil();
                let high = upper.floor().max(low);
                if -MAX_EXACT_INTEGER <= low && high <= MAX_EXACT_INTEGER {
                    rng.gen_range(low as i64..=high as i64) as f64
                } else {
                    // Past 2^53 an i64 draw is not exact; round a real draw instead
                    uniform(rng, low, high).round().clamp(low, high)
                }
            }
        }
    }

    fn sampling_bounds(&self, infinity_bound: f64) -> (f64, f64) {
        let infinity_bound = if infinity_bound.is_nan() {
            DEFAULT_INFINITY_BOUND
        } else {
            infinity_bound.abs().min(f64::MAX)
        };
        let replace = |bound: f64| {
            if bound.is_infinite() {
                infinity_bound.copysign(bound)
            } else {
                bound
            }
        };

        let mut lower = replace(self.lower);
        let mut upper = replace(self.upper);
        if lower > upper {
            if self.lower.is_infinite() {
                lower = upper;
            } else {
                upper = lower;
            }
        }
        (lower, upper)
    }
}

/// Domains are equal when they admit the same values, however their range was written.
impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.lower == other.lower && self.upper == other.upper
    }
}

/// Largest magnitude below which every integer is representable as an f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Widest interval `gen_range` can draw from directly; its scale
/// computation overflows near `f64::MAX`.
const MAX_DIRECT_WIDTH: f64 = f64::MAX / 4.0;

/// Uniform draw over `[lower, upper]`, including intervals wider than `f64::MAX`.
fn uniform<R: Rng + ?Sized>(rng: &mut R, lower: f64, upper: f64) -> f64 {
    if upper - lower <= MAX_DIRECT_WIDTH {
        rng.gen_range(lower..=upper)
    } else {
        let quarter = rng.gen_range(lower / 4.0..=upper / 4.0);
        (quarter * 4.0).clamp(lower, upper)
    }
}

/// Flat persisted form of a [`Variable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub symbol: String,
    pub name: String,
    pub unit: String,
    pub domain_type: DomainKind,
    pub domain_range: String,
}

/// A symbol used in an equation together with its name, unit, and legal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VariableRecord", into = "VariableRecord")]
pub struct Variable {
    pub symbol: String,
    pub name: String,
    pub unit: String,
    pub domain: Domain,
}

impl Variable {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        domain: Domain,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            unit: unit.into(),
            domain,
        }
    }

    /// Builds a variable from its textual domain description, e.g. `("real", "[0, inf]")`.
    pub fn parse(
        symbol: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        kind: DomainKind,
        range: &str,
    ) -> DomainResult<Self> {
        Ok(Self::new(symbol, name, unit, Domain::parse(kind, range)?))
    }

    pub fn is_valid_value(&self, value: f64) -> bool {
        self.domain.is_valid(value)
    }

    /// Column label in the form `symbol (unit)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.symbol, self.unit)
    }

    pub fn to_record(&self) -> VariableRecord {
        VariableRecord {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            unit: self.unit.clone(),
            domain_type: self.domain.kind(),
            domain_range: self.domain.range_string(),
        }
    }

    pub fn from_record(record: &VariableRecord) -> DomainResult<Self> {
        Self::parse(
            record.symbol.clone(),
            record.name.clone(),
            record.unit.clone(),
            record.domain_type,
            &record.domain_range,
        )
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.unit)
    }
}

impl TryFrom<VariableRecord> for Variable {
    type Error = DomainParseError;

    fn try_from(record: VariableRecord) -> Result<Self, Self::Error> {
        Self::from_record(&record)
    }
}

impl From<Variable> for VariableRecord {
    fn from(variable: Variable) -> Self {
        variable.to_record()
    }
}
