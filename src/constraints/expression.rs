//! Expression parsing and evaluation for parameter constraints
//!
//! The grammar is deliberately small: numeric literals, alias names,
//! `+ - * /`, power (`^` or `**`), unary minus and parentheses. Binary
//! operators are left-associative except power, which is right-associative
//! and binds tighter than unary minus (`-a^2 == -(a^2)`).

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{map, opt, recognize},
    multi::{fold_many0, many0},
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

/// Result type for expression evaluation
type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Variable(String),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Context for expression evaluation, providing variable values
pub trait EvaluationContext {
    fn get_variable(&self, name: &str) -> ExprResult<f64>;
}

impl EvaluationContext for HashMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }
}

impl Expression {
    /// Parse an expression from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use diffrefine::constraints::Expression;
    /// use std::collections::HashMap;
    ///
    /// let expr = Expression::parse("1 - occ_La").unwrap();
    /// let vars = HashMap::from([("occ_La".to_string(), 0.25)]);
    /// assert_eq!(expr.evaluate(&vars).unwrap(), 0.75);
    /// ```
    pub fn parse(input: &str) -> ExprResult<Self> {
        match expression(input) {
            Ok((remainder, expr)) if remainder.trim().is_empty() => Ok(expr),
            Ok((remainder, _)) => Err(ExpressionError::ParseError {
                message: format!("unexpected trailing input '{}'", remainder.trim()),
            }),
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{e}"),
            }),
        }
    }

    /// Evaluate the expression with the given context
    ///
    /// Non-finite intermediate results (`(-8) ^ 0.5`) are reported as
    /// [`ExpressionError::InvalidOperation`].
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Variable(name) => context.get_variable(name)?,
            Self::Unary(UnaryOp::Neg, expr) => -expr.evaluate(context)?,
            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div if rhs == 0.0 => return Err(ExpressionError::DivisionByZero),
                    BinaryOp::Div => lhs / rhs,
                    BinaryOp::Pow => lhs.powf(rhs),
                }
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExpressionError::InvalidOperation {
                message: format!("'{self}' evaluates to {value}"),
            })
        }
    }

    /// Sorted, de-duplicated variable names used in the expression
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => vars.push(name.clone()),
            Self::Unary(_, expr) => expr.collect_variables(vars),
            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Variable(name) => write!(f, "{name}"),
            Self::Unary(UnaryOp::Neg, expr) => write!(f, "-({expr})"),
            Self::Binary(op, left, right) => write!(f, "({left} {} {right})", op.symbol()),
        }
    }
}

// Parser functions using nom

type PResult<'a, O> = IResult<&'a str, O>;

/// Surround a parser with optional whitespace
fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// Additive level: term (('+' | '-') term)*
fn expression(input: &str) -> PResult<'_, Expression> {
    let (input, first) = term(input)?;
    fold_many0(
        pair(ws(one_of("+-")), term),
        move || first.clone(),
        |lhs, (op, rhs)| {
            let op = if op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            Expression::Binary(op, Box::new(lhs), Box::new(rhs))
        },
    )
    .parse(input)
}

/// Multiplicative level: unary (('*' | '/') unary)*
fn term(input: &str) -> PResult<'_, Expression> {
    let (input, first) = unary(input)?;
    fold_many0(
        pair(ws(one_of("*/")), unary),
        move || first.clone(),
        |lhs, (op, rhs)| {
            let op = if op == '*' { BinaryOp::Mul } else { BinaryOp::Div };
            Expression::Binary(op, Box::new(lhs), Box::new(rhs))
        },
    )
    .parse(input)
}

/// Sign prefix, then power
fn unary(input: &str) -> PResult<'_, Expression> {
    alt((
        map(preceded(ws(char('-')), unary), |e| {
            Expression::Unary(UnaryOp::Neg, Box::new(e))
        }),
        preceded(ws(char('+')), unary),
        power,
    ))
    .parse(input)
}

/// primary (('^' | '**') unary)?, right-associative through `unary`
fn power(input: &str) -> PResult<'_, Expression> {
    let (input, base) = primary(input)?;
    let (input, exponent) = opt(preceded(ws(alt((tag("**"), tag("^")))), unary)).parse(input)?;
    let expr = match exponent {
        Some(exponent) => Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
        None => base,
    };
    Ok((input, expr))
}

fn primary(input: &str) -> PResult<'_, Expression> {
    // names first, so `nan_x` or `inf` stay variables
    ws(alt((variable, number, parens))).parse(input)
}

/// Decimal literal; signs are consumed by `unary` before this is reached
fn number(input: &str) -> PResult<'_, Expression> {
    map(double, Expression::Number).parse(input)
}

fn variable(input: &str) -> PResult<'_, Expression> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |name: &str| Expression::Variable(name.to_string()),
    )
    .parse(input)
}

fn parens(input: &str) -> PResult<'_, Expression> {
    delimited(ws(char('(')), expression, ws(char(')'))).parse(input)
}
