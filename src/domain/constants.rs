//! Physical constants recognised inside equations.
//!
//! Constant names only match as whole tokens: a name preceded or followed
//! by an ASCII letter, digit, or underscore is part of a longer identifier
//! and is left alone.

use std::f64::consts;

/// Registry of constant names and their values, in lookup order.
pub const PHYSICAL_CONSTANTS: &[(&str, f64)] = &[
    ("pi", consts::PI),
    ("e", consts::E),
    // Speed of light in vacuum [m/s]
    ("c", 299_792_458.0),
    // Gravitational constant [m^3/kg/s^2]
    ("G", 6.67430e-11),
    // Planck constant [J*s]
    ("h", 6.62607015e-34),
    // Boltzmann constant [J/K]
    ("k", 1.380649e-23),
    // Avogadro's number [1/mol]
    ("Na", 6.02214076e23),
    // Ideal gas constant [J/mol/K]
    ("R", 8.314462618),
];

/// Lookup and textual substitution of [`PHYSICAL_CONSTANTS`].
pub struct ConstantHandler;

impl ConstantHandler {
    pub fn value(name: &str) -> Option<f64> {
        PHYSICAL_CONSTANTS
            .iter()
            .find(|(constant, _)| *constant == name)
            .map(|&(_, value)| value)
    }

    pub fn is_constant(name: &str) -> bool {
        Self::value(name).is_some()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        PHYSICAL_CONSTANTS.iter().map(|&(name, _)| name)
    }

    /// Renders a value as a literal the expression lexer reads back exactly.
    pub fn literal(value: f64) -> String {
        format!("{value:?}")
    }

    /// Returns true if `name` occurs in `text` as a whole token.
    pub fn occurs_in(text: &str, name: &str) -> bool {
        tokens(text).any(|token| token == name)
    }

    /// Constants occurring in `text`, in registry order.
    pub fn constants_in(text: &str) -> Vec<&'static str> {
        Self::names().filter(|name| Self::occurs_in(text, name)).collect()
    }

    /// Replaces every whole-token constant name with its numeric literal.
    ///
    /// The text is scanned once, so digits and exponent markers of an
    /// inserted literal are never rescanned as constant names.
    pub fn substitute(text: &str) -> String {
        Self::substitute_except(text, &[])
    }

    /// Like [`ConstantHandler::substitute`], leaving the `reserved` names untouched.
    pub fn substitute_except(text: &str, reserved: &[String]) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(is_word_char) {
            let (before, from_word) = rest.split_at(start);
            result.push_str(before);
            let end = from_word
                .find(|c: char| !is_word_char(c))
                .unwrap_or(from_word.len());
            let (word, after) = from_word.split_at(end);
            match Self::value(word) {
                Some(value) if !reserved.iter().any(|name| name == word) => {
                    result.push_str(&Self::literal(value))
                }
                _ => result.push_str(word),
            }
            rest = after;
        }

        result.push_str(rest);
        result
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Maximal runs of word characters.
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c)).filter(|t| !t.is_empty())
}
