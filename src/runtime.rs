use crate::ast::{BinaryOp, Expr, Statement};
use crate::config::Settings;
use crate::error::{arithmetic_error, type_error, Error};
use crate::{environment::Environment, error::Result};
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    io::Write,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    /// Exact quotient of a division that did not come out even.
    /// Always in lowest terms with `denom > 1`.
    Rational {
        numer: i64,
        denom: i64,
    },
    /// Keeps the quote characters of the literal it came from.
    Text(String),
    Boolean(bool),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Rational { numer, denom } => write!(f, "{}/{}", numer, denom),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) | Value::Rational { .. } => "number",
            Value::Text(_) => "string",
            Value::Boolean(_) => "boolean",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Rational { .. } => true,
            Value::Text(s) => !s.is_empty(),
            Value::Boolean(b) => *b,
        }
    }

    fn as_fraction(&self) -> Option<(i128, i128)> {
        match self {
            Value::Integer(n) => Some((*n as i128, 1)),
            Value::Rational { numer, denom } => Some((*numer as i128, *denom as i128)),
            _ => None,
        }
    }

    fn from_fraction(numer: i128, denom: i128) -> Result<Value> {
        assert!(denom != 0, "fraction with zero denominator");

        let sign = if denom < 0 { -1 } else { 1 };
        let divisor = gcd(numer, denom).max(1);
        let numer = sign * numer / divisor;
        let denom = sign * denom / divisor;

        let overflow = || Error::Arithmetic {
            message: "Integer overflow".to_string(),
        };
        let numer = i64::try_from(numer).map_err(|_| overflow())?;
        let denom = i64::try_from(denom).map_err(|_| overflow())?;

        if denom == 1 {
            Ok(Value::Integer(numer))
        } else {
            Ok(Value::Rational { numer, denom })
        }
    }
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Value(Value),
    /// An assignment; carries the assigned name rather than the value.
    Assigned(String),
    Nothing,
}

impl Outcome {
    /// What the session prints for this outcome, if anything.
    pub fn display(&self) -> Option<String> {
        match self {
            Outcome::Value(value @ (Value::Integer(_) | Value::Rational { .. })) => {
                Some(value.to_string())
            }
            Outcome::Value(Value::Text(s)) if s.starts_with('"') => Some(s.clone()),
            _ => None,
        }
    }
}

pub struct Evaluator<'a> {
    env: &'a mut Environment,
    settings: &'a Settings,
    out: &'a mut dyn Write,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a mut Environment, settings: &'a Settings, out: &'a mut dyn Write) -> Self {
        Evaluator { env, settings, out }
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<Outcome> {
        match statement {
            Statement::Empty => Ok(Outcome::Nothing),
            Statement::Expression(expr) => Ok(Outcome::Value(self.evaluate(expr)?)),
            Statement::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.env.insert(name.clone(), value);
                Ok(Outcome::Assigned(name.clone()))
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_val = self.evaluate(condition)?;

                if self.settings.trace_conditions {
                    writeln!(self.out, "Condition evaluated to: {}", cond_val)?;
                    writeln!(self.out, "node {:?}", statement)?;
                }

                if cond_val.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Outcome::Nothing)
                }
            }
            Statement::While { condition, body } => {
                let mut iterations: u64 = 0;

                while self.evaluate(condition)?.is_truthy() {
                    if let Some(limit) = self.settings.max_iterations {
                        if iterations >= limit {
                            return Err(Error::IterationLimit { limit });
                        }
                    }
                    iterations += 1;

                    self.execute(body)?;
                }

                Ok(Outcome::Nothing)
            }
        }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Integer(*n)),
            Expr::Str(s) => Ok(Value::Text(s.clone())),
            Expr::Variable(name) => match self.env.get(name) {
                Some(value) => Ok(value.clone()),
                None => {
                    writeln!(self.out, "Undefined variable '{}' found!", name)?;
                    Ok(Value::Integer(0))
                }
            },
            Expr::Negate(operand) => {
                let value = self.evaluate(operand)?;
                match value.as_fraction() {
                    Some((numer, denom)) => Value::from_fraction(-numer, denom),
                    None => type_error(&format!(
                        "Cannot negate a {} ({})",
                        value.type_name(),
                        value
                    )),
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;
                evaluate_binary(*operator, &left_val, &right_val)
            }
        }
    }
}

fn evaluate_binary(operator: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let ((a, b), (c, d)) = match (left.as_fraction(), right.as_fraction()) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return type_error(&format!(
                "Operands of '{}' must be numbers, got {} and {}",
                operator.symbol(),
                left.type_name(),
                right.type_name()
            ))
        }
    };

    // Denominators are always positive, so cross-multiplying preserves order
    match operator {
        BinaryOp::Add => Value::from_fraction(a * d + c * b, b * d),
        BinaryOp::Subtract => Value::from_fraction(a * d - c * b, b * d),
        BinaryOp::Multiply => Value::from_fraction(a * c, b * d),
        BinaryOp::Divide => {
            if c == 0 {
                arithmetic_error("Division by zero")
            } else {
                Value::from_fraction(a * d, b * c)
            }
        }
        BinaryOp::Less => Ok(Value::Boolean((a * d).cmp(&(c * b)) == Ordering::Less)),
        BinaryOp::Greater => Ok(Value::Boolean((a * d).cmp(&(c * b)) == Ordering::Greater)),
    }
}
