use crate::capability::traits::{required_str, string_params_schema, Capability, CapabilityResult};
use serde_json::Value;
use std::fmt;

/// Arithmetic-only evaluator. Expressions are parsed by a small grammar
/// (numbers, `+ - * / // % **`, parentheses, unary signs); there is no name
/// lookup at all, so nothing outside arithmetic can run.
pub struct CalculatorTool;

#[async_trait::async_trait]
impl Capability for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a math expression."
    }

    fn parameters_schema(&self) -> Value {
        string_params_schema(
            &[("expression", "Arithmetic expression, e.g. (2 + 3) * 4 ** 2")],
            &["expression"],
        )
    }

    async fn invoke(&self, args: Value) -> CapabilityResult {
        let expression = required_str(&args, self.name(), "expression")?;
        Ok(match evaluate(expression) {
            Ok(value) => format_number(value),
            Err(e) => format!("[Calculator error: {e}]"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalcError {
    UnexpectedChar(char, usize),
    UnexpectedEnd,
    TrailingInput(usize),
    DivisionByZero,
    NotFinite,
    TooDeep,
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::UnexpectedChar(c, pos) => write!(f, "unexpected character '{c}' at position {pos}"),
            CalcError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            CalcError::TrailingInput(pos) => write!(f, "unexpected input at position {pos}"),
            CalcError::DivisionByZero => write!(f, "division by zero"),
            CalcError::NotFinite => write!(f, "result is not a finite number"),
            CalcError::TooDeep => write!(f, "expression nested too deeply"),
        }
    }
}

impl std::error::Error for CalcError {}

const MAX_DEPTH: usize = 64;

pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let mut parser = Parser {
        chars: expression.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(match parser.chars[parser.pos] {
            c if c.is_ascii_digit() || "+-*/%().".contains(c) => CalcError::TrailingInput(parser.pos),
            c => CalcError::UnexpectedChar(c, parser.pos),
        });
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Integral results print without a fractional part, like `4` for `2+2`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

// expr   := term (('+' | '-') term)*
// term   := unary (('*' | '/' | '//' | '%') unary)*
// unary  := ('+' | '-') unary | power
// power  := atom ('**' unary)?
// atom   := number | '(' expr ')'
impl Parser {
    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn peek_two(&mut self, a: char, b: char) -> bool {
        self.skip_ws();
        self.chars.get(self.pos) == Some(&a) && self.chars.get(self.pos + 1) == Some(&b)
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some('-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            if self.peek_two('*', '*') {
                // power binds tighter and is handled below
                return Ok(value);
            }
            if self.peek_two('/', '/') {
                self.pos += 2;
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value = (value / rhs).floor();
                continue;
            }
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some('/') => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= rhs;
                }
                Some('%') => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    // sign follows the divisor
                    value -= rhs * (value / rhs).floor();
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        let result = match self.peek() {
            Some('-') => {
                self.pos += 1;
                self.unary().map(|v| -v)
            }
            Some('+') => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.atom()?;
        if self.peek_two('*', '*') {
            self.pos += 2;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(c) => Err(CalcError::UnexpectedChar(c, self.pos)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(CalcError::UnexpectedChar(c, self.pos)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while self.pos < self.chars.len()
            && (self.chars[self.pos].is_ascii_digit() || self.chars[self.pos] == '.')
        {
            self.pos += 1;
        }
        // optional exponent: 1e3, 2.5E-4
        if self.pos < self.chars.len() && matches!(self.chars[self.pos], 'e' | 'E') {
            let mut lookahead = self.pos + 1;
            if lookahead < self.chars.len() && matches!(self.chars[lookahead], '+' | '-') {
                lookahead += 1;
            }
            if lookahead < self.chars.len() && self.chars[lookahead].is_ascii_digit() {
                self.pos = lookahead;
                while self.pos < self.chars.len() && self.chars[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| CalcError::UnexpectedChar(self.chars[start], start))
    }
}
