//! Expression parser for formula equations.
//!
//! This module implements a recursive descent parser for the arithmetic
//! expressions used as formula equations and regressed models. Expressions
//! are evaluated by walking the AST against a set of symbol bindings; no
//! other code execution path exists.
//!
//! # BNF Grammar
//!
//! ```bnf
//! Expression     ::= Addition
//! Addition       ::= Multiplication ( ( "+" | "-" ) Multiplication )*
//! Multiplication ::= Unary ( ( "*" | "/" | "%" ) Unary )*
//! Unary          ::= ( "+" | "-" ) Unary | Power
//! Power          ::= Primary ( ( "**" | "^" ) Unary )?
//! Primary        ::= Number | Identifier | FunctionCall | "(" Expression ")"
//! FunctionCall   ::= Identifier "(" ArgumentList? ")"
//! ArgumentList   ::= Expression ( "," Expression )*
//! Number         ::= ( [0-9]+ ( "." [0-9]* )? | "." [0-9]+ ) ( [eE] [+-]? [0-9]+ )?
//! Identifier     ::= [A-Za-z_] [A-Za-z0-9_]*
//! ```
//!
//! Power binds tighter than unary minus and is right-associative, so
//! `-x ** 2` is `-(x ** 2)` and `2 ** -1` is `0.5`.

use std::collections::{BTreeSet, HashMap};

use super::constants::ConstantHandler;
use super::errors::{EvalError, EvalResult};

/// Represents a token in the expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Identifier(String),

    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Power,
    PowerAlt, // ^ alternative to **

    LeftParen,
    RightParen,
    Comma,

    Eof,
}

/// Represents an Abstract Syntax Tree node for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),

    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },

    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Names of every symbol referenced by the expression, excluding function names.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, symbols: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                symbols.insert(name.clone());
            }
            Expr::Binary { left, right, .. } => {
                left.collect_symbols(symbols);
                right.collect_symbols(symbols);
            }
            Expr::Unary { operand, .. } => operand.collect_symbols(symbols),
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_symbols(symbols);
                }
            }
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

/// Unary operators.
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Lexical analyzer for tokenizing expressions.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_digits(&mut self, number_str: &mut String) {
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads a number token, with optional fraction and exponent.
    fn read_number(&mut self) -> EvalResult<f64> {
        let mut number_str = String::new();

        self.read_digits(&mut number_str);

        if self.current_char == Some('.') {
            number_str.push('.');
            self.advance();
            self.read_digits(&mut number_str);
        }

        // Only consume `e` when digits follow, so `2e` stays a number and a name
        if matches!(self.current_char, Some('e' | 'E')) {
            let digits_at = match self.peek(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digits_at {
                    if let Some(ch) = self.current_char {
                        number_str.push(ch);
                    }
                    self.advance();
                }
                self.read_digits(&mut number_str);
            }
        }

        number_str
            .parse::<f64>()
            .map_err(|_| EvalError::InvalidNumber(number_str))
    }

    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        identifier
    }

    /// Gets the next token from the input.
    pub fn next_token(&mut self) -> EvalResult<Token> {
        self.skip_whitespace();

        let Some(ch) = self.current_char else {
            return Ok(Token::Eof);
        };

        match ch {
            '0'..='9' => Ok(Token::Number(self.read_number()?)),

            '.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                Ok(Token::Number(self.read_number()?))
            }

            c if c.is_alphabetic() || c == '_' => Ok(Token::Identifier(self.read_identifier())),

            '+' => {
                self.advance();
                Ok(Token::Plus)
            }

            '-' => {
                self.advance();
                Ok(Token::Minus)
            }

            '*' => {
                self.advance();
                if self.current_char == Some('*') {
                    self.advance();
                    Ok(Token::Power)
                } else {
                    Ok(Token::Multiply)
                }
            }

            '/' => {
                self.advance();
                Ok(Token::Divide)
            }

            '%' => {
                self.advance();
                Ok(Token::Modulo)
            }

            '^' => {
                self.advance();
                Ok(Token::PowerAlt)
            }

            '(' => {
                self.advance();
                Ok(Token::LeftParen)
            }

            ')' => {
                self.advance();
                Ok(Token::RightParen)
            }

            ',' => {
                self.advance();
                Ok(Token::Comma)
            }

            _ => Err(EvalError::UnexpectedCharacter(ch)),
        }
    }
}

/// Function signature for built-in math functions.
pub type FunctionImpl = fn(&[f64]) -> EvalResult<f64>;

/// Registry of the math functions an expression may call.
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionImpl>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register_builtin_functions();
        registry
    }

    /// Registers a function under a case-sensitive name.
    pub fn register_function(&mut self, name: &str, func: FunctionImpl) {
        self.functions.insert(name.to_string(), func);
    }

    pub fn get_function(&self, name: &str) -> Option<&FunctionImpl> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    fn register_builtin_functions(&mut self) {
        self.register_function("sqrt", |args| {
            let x = single("sqrt", args)?;
            if x < 0.0 {
                Err(EvalError::MathDomain(format!("sqrt of negative number {x}")))
            } else {
                Ok(x.sqrt())
            }
        });

        self.register_function("exp", |args| Ok(single("exp", args)?.exp()));

        self.register_function("ln", |args| natural_log(single("ln", args)?));

        self.register_function("log", |args| match args {
            [x] => natural_log(*x),
            [x, base] => {
                if *base <= 0.0 || *base == 1.0 {
                    return Err(EvalError::MathDomain(format!("invalid logarithm base {base}")));
                }
                Ok(natural_log(*x)? / base.ln())
            }
            _ => Err(EvalError::FunctionArity {
                name: "log".to_string(),
                expected: "1 or 2".to_string(),
                found: args.len(),
            }),
        });

        self.register_function("sin", |args| Ok(single("sin", args)?.sin()));
        self.register_function("cos", |args| Ok(single("cos", args)?.cos()));
        self.register_function("tan", |args| Ok(single("tan", args)?.tan()));

        self.register_function("asin", |args| {
            let x = single("asin", args)?;
            unit_interval("asin", x)?;
            Ok(x.asin())
        });

        self.register_function("acos", |args| {
            let x = single("acos", args)?;
            unit_interval("acos", x)?;
            Ok(x.acos())
        });

        self.register_function("atan", |args| Ok(single("atan", args)?.atan()));
        self.register_function("sinh", |args| Ok(single("sinh", args)?.sinh()));
        self.register_function("cosh", |args| Ok(single("cosh", args)?.cosh()));
        self.register_function("tanh", |args| Ok(single("tanh", args)?.tanh()));

        self.register_function("abs", |args| Ok(single("abs", args)?.abs()));
        self.register_function("Abs", |args| Ok(single("Abs", args)?.abs()));
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn single(name: &str, args: &[f64]) -> EvalResult<f64> {
    match args {
        [x] => Ok(*x),
        _ => Err(EvalError::FunctionArity {
            name: name.to_string(),
            expected: "1".to_string(),
            found: args.len(),
        }),
    }
}

fn natural_log(x: f64) -> EvalResult<f64> {
    if x <= 0.0 {
        Err(EvalError::MathDomain(format!("logarithm of non-positive number {x}")))
    } else {
        Ok(x.ln())
    }
}

fn unit_interval(name: &str, x: f64) -> EvalResult<()> {
    if (-1.0..=1.0).contains(&x) {
        Ok(())
    } else {
        Err(EvalError::MathDomain(format!("{name} argument {x} outside [-1, 1]")))
    }
}

/// Deepest expression tree, and deepest parser nesting, accepted.
pub const MAX_DEPTH: usize = 256;

/// A parsed subtree and its height.
struct Parsed {
    expr: Expr,
    height: usize,
}

impl Parsed {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }

    fn binary(left: Parsed, operator: BinaryOp, right: Parsed) -> EvalResult<Self> {
        let height = checked_height(left.height.max(right.height))?;
        Ok(Self {
            expr: Expr::Binary {
                left: Box::new(left.expr),
                operator,
                right: Box::new(right.expr),
            },
            height,
        })
    }
}

fn checked_height(child_height: usize) -> EvalResult<usize> {
    let height = child_height + 1;
    if height > MAX_DEPTH {
        Err(too_deep())
    } else {
        Ok(height)
    }
}

fn too_deep() -> EvalError {
    EvalError::Syntax("expression nested too deeply".to_string())
}

/// Recursive descent parser for equation expressions.
///
/// Trees taller than [`MAX_DEPTH`] are rejected while parsing, so walking
/// the result never recurses deeper than that.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    nesting: usize,
}

impl Parser {
    pub fn new(input: &str) -> EvalResult<Self> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;

        Ok(Self {
            lexer,
            current_token,
            nesting: 0,
        })
    }

    fn advance(&mut self) -> EvalResult<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> EvalResult<()> {
        if std::mem::discriminant(&self.current_token) == std::mem::discriminant(&expected) {
            self.advance()
        } else {
            Err(EvalError::Syntax(format!(
                "expected {:?}, found {:?}",
                expected, self.current_token
            )))
        }
    }

    /// Parses the whole input as one expression.
    pub fn parse(&mut self) -> EvalResult<Expr> {
        let parsed = self.parse_addition()?;

        if self.current_token != Token::Eof {
            return Err(EvalError::Syntax(format!(
                "unexpected token at end: {:?}",
                self.current_token
            )));
        }

        Ok(parsed.expr)
    }

    fn parse_addition(&mut self) -> EvalResult<Parsed> {
        let mut left = self.parse_multiplication()?;

        while matches!(self.current_token, Token::Plus | Token::Minus) {
            let op = match self.current_token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => unreachable!(),
            };
            self.advance()?;
            let right = self.parse_multiplication()?;
            left = Parsed::binary(left, op, right)?;
        }

        Ok(left)
    }

    fn parse_multiplication(&mut self) -> EvalResult<Parsed> {
        let mut left = self.parse_unary()?;

        while matches!(
            self.current_token,
            Token::Multiply | Token::Divide | Token::Modulo
        ) {
            let op = match self.current_token {
                Token::Multiply => BinaryOp::Multiply,
                Token::Divide => BinaryOp::Divide,
                Token::Modulo => BinaryOp::Modulo,
                _ => unreachable!(),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Parsed::binary(left, op, right)?;
        }

        Ok(left)
    }

    /// Every recursive path of the grammar passes through here.
    fn parse_unary(&mut self) -> EvalResult<Parsed> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(too_deep());
        }
        let parsed = self.parse_signed();
        self.nesting -= 1;
        parsed
    }

    fn parse_signed(&mut self) -> EvalResult<Parsed> {
        let operator = match self.current_token {
            Token::Plus => UnaryOp::Plus,
            Token::Minus => UnaryOp::Minus,
            _ => return self.parse_power(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Parsed {
            height: checked_height(operand.height)?,
            expr: Expr::Unary {
                operator,
                operand: Box::new(operand.expr),
            },
        })
    }

    /// Parses power expressions (right-associative).
    fn parse_power(&mut self) -> EvalResult<Parsed> {
        let left = self.parse_primary()?;

        if matches!(self.current_token, Token::Power | Token::PowerAlt) {
            self.advance()?;
            let right = self.parse_unary()?;
            Parsed::binary(left, BinaryOp::Power, right)
        } else {
            Ok(left)
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Parsed> {
        match &self.current_token {
            Token::Number(value) => {
                let value = *value;
                self.advance()?;
                Ok(Parsed::leaf(Expr::Number(value)))
            }

            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;

                if self.current_token == Token::LeftParen {
                    self.advance()?;
                    let args = self.parse_argument_list()?;
                    self.expect(Token::RightParen)?;
                    let tallest = args.iter().map(|arg| arg.height).max().unwrap_or(0);
                    Ok(Parsed {
                        height: checked_height(tallest)?,
                        expr: Expr::FunctionCall {
                            name,
                            args: args.into_iter().map(|arg| arg.expr).collect(),
                        },
                    })
                } else {
                    Ok(Parsed::leaf(Expr::Symbol(name)))
                }
            }

            Token::LeftParen => {
                self.advance()?;
                let parsed = self.parse_addition()?;
                self.expect(Token::RightParen)?;
                Ok(parsed)
            }

            _ => Err(EvalError::Syntax(format!(
                "unexpected token: {:?}",
                self.current_token
            ))),
        }
    }

    fn parse_argument_list(&mut self) -> EvalResult<Vec<Parsed>> {
        let mut args = Vec::new();

        if self.current_token == Token::RightParen {
            return Ok(args);
        }

        args.push(self.parse_addition()?);

        while self.current_token == Token::Comma {
            self.advance()?;
            args.push(self.parse_addition()?);
        }

        Ok(args)
    }
}

/// Parses `input` into an AST.
pub fn parse_expression(input: &str) -> EvalResult<Expr> {
    Parser::new(input)?.parse()
}

/// Walks the AST, resolving symbols from the bindings and then the constant registry.
pub struct ExpressionEvaluator<'a> {
    bindings: &'a HashMap<String, f64>,
    function_registry: &'a FunctionRegistry,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(bindings: &'a HashMap<String, f64>, function_registry: &'a FunctionRegistry) -> Self {
        Self {
            bindings,
            function_registry,
        }
    }

    /// Evaluates an expression; NaN or infinite results are errors.
    pub fn evaluate(&self, expr: &Expr) -> EvalResult<f64> {
        let value = self.evaluate_node(expr)?;
        if value.is_nan() {
            Err(EvalError::MathDomain("result is not a number".to_string()))
        } else if value.is_infinite() {
            Err(EvalError::NonFinite)
        } else {
            Ok(value)
        }
    }

    fn resolve(&self, name: &str) -> EvalResult<f64> {
        self.bindings
            .get(name)
            .copied()
            .or_else(|| ConstantHandler::value(name))
            .ok_or_else(|| EvalError::UnknownSymbol(name.to_string()))
    }

    fn evaluate_node(&self, expr: &Expr) -> EvalResult<f64> {
        match expr {
            Expr::Number(value) => Ok(*value),

            Expr::Symbol(name) => self.resolve(name),

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate_node(left)?;
                let right_val = self.evaluate_node(right)?;

                match operator {
                    BinaryOp::Add => Ok(left_val + right_val),
                    BinaryOp::Subtract => Ok(left_val - right_val),
                    BinaryOp::Multiply => Ok(left_val * right_val),
                    BinaryOp::Divide => {
                        if right_val == 0.0 {
                            Err(EvalError::DivisionByZero)
                        } else {
                            Ok(left_val / right_val)
                        }
                    }
                    BinaryOp::Modulo => {
                        if right_val == 0.0 {
                            Err(EvalError::DivisionByZero)
                        } else {
                            // Sign follows the divisor, as in floored modulo
                            Ok(left_val - right_val * (left_val / right_val).floor())
                        }
                    }
                    BinaryOp::Power => power(left_val, right_val),
                }
            }

            Expr::Unary { operator, operand } => {
                let operand_val = self.evaluate_node(operand)?;

                match operator {
                    UnaryOp::Plus => Ok(operand_val),
                    UnaryOp::Minus => Ok(-operand_val),
                }
            }

            Expr::FunctionCall { name, args } => {
                let func = self
                    .function_registry
                    .get_function(name)
                    .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;

                let arg_values = args
                    .iter()
                    .map(|arg| self.evaluate_node(arg))
                    .collect::<EvalResult<Vec<f64>>>()?;
                func(&arg_values)
            }
        }
    }
}

fn power(base: f64, exponent: f64) -> EvalResult<f64> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(EvalError::MathDomain(format!(
            "negative base {base} raised to fractional power {exponent}"
        )));
    }
    Ok(base.powf(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_with(input: &str, bindings: &[(&str, f64)]) -> EvalResult<f64> {
        let bindings: HashMap<String, f64> = bindings
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        let registry = FunctionRegistry::new();
        let expr = parse_expression(input)?;
        ExpressionEvaluator::new(&bindings, &registry).evaluate(&expr)
    }

    fn eval(input: &str) -> EvalResult<f64> {
        eval_with(input, &[])
    }

    #[test]
    fn test_lexer_numbers() {
        let mut lexer = Lexer::new("42 3.14 .5 6.62607015e-34 1E3 2.");

        assert_eq!(lexer.next_token().unwrap(), Token::Number(42.0));
        assert_eq!(lexer.next_token().unwrap(), Token::Number(3.14));
        assert_eq!(lexer.next_token().unwrap(), Token::Number(0.5));
        assert_eq!(lexer.next_token().unwrap(), Token::Number(6.62607015e-34));
        assert_eq!(lexer.next_token().unwrap(), Token::Number(1000.0));
        assert_eq!(lexer.next_token().unwrap(), Token::Number(2.0));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_lexer_exponent_needs_digits() {
        let mut lexer = Lexer::new("2e");

        assert_eq!(lexer.next_token().unwrap(), Token::Number(2.0));
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("e".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_lexer_operators() {
        let mut lexer = Lexer::new("+ - * / % ** ^ ( ) ,");

        assert_eq!(lexer.next_token().unwrap(), Token::Plus);
        assert_eq!(lexer.next_token().unwrap(), Token::Minus);
        assert_eq!(lexer.next_token().unwrap(), Token::Multiply);
        assert_eq!(lexer.next_token().unwrap(), Token::Divide);
        assert_eq!(lexer.next_token().unwrap(), Token::Modulo);
        assert_eq!(lexer.next_token().unwrap(), Token::Power);
        assert_eq!(lexer.next_token().unwrap(), Token::PowerAlt);
        assert_eq!(lexer.next_token().unwrap(), Token::LeftParen);
        assert_eq!(lexer.next_token().unwrap(), Token::RightParen);
        assert_eq!(lexer.next_token().unwrap(), Token::Comma);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_lexer_identifiers_keep_case() {
        let mut lexer = Lexer::new("k_spring V_epsilon G x2");

        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("k_spring".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("V_epsilon".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("G".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("x2".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_lexer_error_handling() {
        let mut lexer = Lexer::new("2 ; 3");
        assert_eq!(lexer.next_token().unwrap(), Token::Number(2.0));
        assert_eq!(lexer.next_token(), Err(EvalError::UnexpectedCharacter(';')));
    }

    #[test]
    fn test_parser_operator_precedence() {
        // 2 + 3 * 4 is 2 + (3 * 4)
        let expr = parse_expression("2 + 3 * 4").unwrap();
        match expr {
            Expr::Binary { left, operator: BinaryOp::Add, right } => {
                assert_eq!(*left, Expr::Number(2.0));
                assert!(matches!(
                    right.as_ref(),
                    Expr::Binary { operator: BinaryOp::Multiply, .. }
                ));
            }
            _ => panic!("Expected addition at top level"),
        }
    }

    #[test]
    fn test_parser_power_right_associative() {
        let expr = parse_expression("2 ** 3 ** 2").unwrap();
        match expr {
            Expr::Binary { left, operator: BinaryOp::Power, right } => {
                assert_eq!(*left, Expr::Number(2.0));
                assert!(matches!(
                    right.as_ref(),
                    Expr::Binary { operator: BinaryOp::Power, .. }
                ));
            }
            _ => panic!("Expected power at top level"),
        }
        assert_eq!(eval("2 ** 3 ** 2").unwrap(), 512.0);
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse_expression("-x ** 2").unwrap();
        assert!(matches!(expr, Expr::Unary { operator: UnaryOp::Minus, .. }));
        assert_eq!(eval_with("-x ** 2", &[("x", 3.0)]).unwrap(), -9.0);
        assert_eq!(eval("2 ** -1").unwrap(), 0.5);
        assert_eq!(eval("--2").unwrap(), 2.0);
    }

    #[test]
    fn test_parser_function_calls() {
        let expr = parse_expression("sqrt(x, 2)").unwrap();
        assert_eq!(
            expr,
            Expr::FunctionCall {
                name: "sqrt".to_string(),
                args: vec![Expr::Symbol("x".to_string()), Expr::Number(2.0)],
            }
        );
    }

    #[test]
    fn test_parser_error_handling() {
        assert!(matches!(parse_expression("2 +"), Err(EvalError::Syntax(_))));
        assert!(matches!(parse_expression("(2 + 3"), Err(EvalError::Syntax(_))));
        assert!(matches!(parse_expression("2 3"), Err(EvalError::Syntax(_))));
        assert!(matches!(parse_expression(""), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn test_symbols() {
        let expr = parse_expression("0.5 * k_spring * x ** 2 + sqrt(m) * c").unwrap();
        let symbols: Vec<String> = expr.symbols().into_iter().collect();
        assert_eq!(symbols, vec!["c", "k_spring", "m", "x"]);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(eval("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(eval("15 / 3 - 1").unwrap(), 4.0);
        assert_eq!(eval("3 ^ 2").unwrap(), 9.0);
        assert_eq!(eval("10 % 3").unwrap(), 1.0);
        assert_eq!(eval("-7 % 3").unwrap(), 2.0);
    }

    #[test]
    fn test_bindings_shadow_constants() {
        assert_eq!(eval_with("k * 2", &[("k", 4.0)]).unwrap(), 8.0);
        assert_eq!(eval("k").unwrap(), 1.380649e-23);
        assert_eq!(eval("pi").unwrap(), std::f64::consts::PI);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("sqrt(16)").unwrap(), 4.0);
        assert_eq!(eval("exp(0)").unwrap(), 1.0);
        assert_eq!(eval("ln(1)").unwrap(), 0.0);
        assert!((eval("log(8, 2)").unwrap() - 3.0).abs() < 1e-12);
        assert!((eval("sin(pi / 2)").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(eval("abs(-3)").unwrap(), 3.0);
        assert_eq!(eval("Abs(-3)").unwrap(), 3.0);
    }

    #[test]
    fn test_error_handling() {
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1 % 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("0 ** -1"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("y + 1"), Err(EvalError::UnknownSymbol("y".to_string())));
        assert_eq!(eval("SQRT(4)"), Err(EvalError::UnknownFunction("SQRT".to_string())));
        assert!(matches!(eval("sqrt(-1)"), Err(EvalError::MathDomain(_))));
        assert!(matches!(eval("ln(0)"), Err(EvalError::MathDomain(_))));
        assert!(matches!(eval("asin(2)"), Err(EvalError::MathDomain(_))));
        assert!(matches!(eval("(-8) ** 0.5"), Err(EvalError::MathDomain(_))));
        assert!(matches!(eval("sqrt(1, 2)"), Err(EvalError::FunctionArity { found: 2, .. })));
        assert_eq!(eval("exp(1000)"), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let too_deep = EvalError::Syntax("expression nested too deeply".to_string());
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(parse_expression(&parens), Err(too_deep.clone()));
        assert_eq!(parse_expression(&"(".repeat(10_000)), Err(too_deep.clone()));
        assert_eq!(parse_expression(&format!("{}1", "-".repeat(10_000))), Err(too_deep.clone()));
        assert_eq!(parse_expression(&format!("{}x", "sqrt(".repeat(10_000))), Err(too_deep.clone()));
    }

    #[test]
    fn test_long_operator_chains_are_bounded() {
        let chain = vec!["1"; 100_000].join(" + ");
        assert!(matches!(parse_expression(&chain), Err(EvalError::Syntax(_))));

        let chain = vec!["2"; 100].join(" * ");
        assert_eq!(eval(&chain).unwrap(), 2f64.powi(100));

        let nested = format!("{}1{}", "(".repeat(MAX_DEPTH / 2), ")".repeat(MAX_DEPTH / 2));
        assert_eq!(eval(&nested).unwrap(), 1.0);
    }
}
