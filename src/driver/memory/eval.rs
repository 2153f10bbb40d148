//! Expression evaluation against joined rows.

use super::ast::{BinaryOperator, Expression};
use crate::metamodel::Value;
use anyhow::{anyhow, bail, Result};
use std::cmp::Ordering;

/// Column layout of the joined row a statement evaluates against
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// (table name, column names, offset of the first column in the joined row)
    tables: Vec<(String, Vec<String>, usize)>,
    width: usize,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: &str, columns: Vec<String>) {
        let offset = self.width;
        self.width += columns.len();
        self.tables.push((table.to_string(), columns, offset));
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Position of a column in the joined row
    pub fn resolve(&self, table: Option<&str>, column: &str) -> Result<usize> {
        let mut found = None;
        for (name, columns, offset) in &self.tables {
            if let Some(t) = table {
                if !name.eq_ignore_ascii_case(t) {
                    continue;
                }
            }
            if let Some(i) = columns.iter().position(|c| c.eq_ignore_ascii_case(column)) {
                if found.is_some() {
                    bail!("Ambiguous column: {}", column);
                }
                found = Some(offset + i);
            }
        }
        found.ok_or_else(|| match table {
            Some(t) => anyhow!("Unknown column: {}.{}", t, column),
            None => anyhow!("Unknown column: {}", column),
        })
    }
}

/// Evaluator for expressions
pub struct Evaluator<'a> {
    scope: &'a Scope,
    parameters: &'a [Value],
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a Scope, parameters: &'a [Value]) -> Self {
        Self { scope, parameters }
    }

    /// Evaluate a predicate; NULL counts as false
    pub fn matches(&self, expr: &Expression, row: &[Value]) -> Result<bool> {
        match self.evaluate(expr, row)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => bail!("Predicate evaluated to {}", other.type_name()),
        }
    }

    /// Evaluate an expression and return the result
    pub fn evaluate(&self, expr: &Expression, row: &[Value]) -> Result<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),

            Expression::Parameter(index) => index
                .checked_sub(1)
                .and_then(|i| self.parameters.get(i))
                .cloned()
                .ok_or_else(|| anyhow!("Parameter {} was never set", index)),

            Expression::Column(name) => self.column(None, name, row),

            Expression::QualifiedColumn(table, name) => self.column(Some(table), name, row),

            Expression::BinaryOp { left, op, right } => {
                let left = self.evaluate(left, row)?;
                let right = self.evaluate(right, row)?;
                evaluate_binary_op(*op, left, right)
            }

            Expression::Not(operand) => match self.evaluate(operand, row)? {
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                Value::Null => Ok(Value::Null),
                other => bail!("NOT requires a boolean, got {}", other.type_name()),
            },

            Expression::InList {
                expression,
                list,
                negated,
            } => {
                let value = self.evaluate(expression, row)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                // x IN (a, b) is x = a OR x = b, with NULL propagation
                let mut result = Value::Boolean(false);
                for item in list {
                    let item = self.evaluate(item, row)?;
                    let equal = evaluate_binary_op(BinaryOperator::Equal, value.clone(), item)?;
                    result = evaluate_binary_op(BinaryOperator::Or, result, equal)?;
                    if result == Value::Boolean(true) {
                        break;
                    }
                }
                match (result, negated) {
                    (Value::Boolean(b), true) => Ok(Value::Boolean(!b)),
                    (result, _) => Ok(result),
                }
            }

            Expression::Like {
                expression,
                pattern,
                escape,
                negated,
            } => {
                let value = self.evaluate(expression, row)?;
                let pattern = self.evaluate(pattern, row)?;
                match (value, pattern) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (Value::String(s), Value::String(p)) => {
                        Ok(Value::Boolean(like_match(&s, &p, *escape) != *negated))
                    }
                    (v, p) => bail!(
                        "LIKE requires strings, got {} and {}",
                        v.type_name(),
                        p.type_name()
                    ),
                }
            }

            Expression::IsNull {
                expression,
                negated,
            } => {
                let value = self.evaluate(expression, row)?;
                Ok(Value::Boolean(value.is_null() != *negated))
            }
        }
    }

    fn column(&self, table: Option<&str>, name: &str, row: &[Value]) -> Result<Value> {
        let index = self.scope.resolve(table, name)?;
        row.get(index).cloned().ok_or_else(|| {
            anyhow!(
                "Column index {} out of bounds (row has {} values)",
                index,
                row.len()
            )
        })
    }
}

/// Evaluate a binary operation with three-valued logic
fn evaluate_binary_op(op: BinaryOperator, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOperator::And => match (&left, &right) {
            // NULL AND false = false, NULL AND true = NULL
            (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Ok(Value::Boolean(false)),
            (Value::Boolean(true), Value::Boolean(true)) => Ok(Value::Boolean(true)),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            _ => bail!(
                "AND requires booleans, got {} and {}",
                left.type_name(),
                right.type_name()
            ),
        },
        BinaryOperator::Or => match (&left, &right) {
            // NULL OR true = true, NULL OR false = NULL
            (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Ok(Value::Boolean(true)),
            (Value::Boolean(false), Value::Boolean(false)) => Ok(Value::Boolean(false)),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            _ => bail!(
                "OR requires booleans, got {} and {}",
                left.type_name(),
                right.type_name()
            ),
        },
        _ => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let ordering = compare_non_null(&left, &right).ok_or_else(|| {
                anyhow!(
                    "Cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                )
            })?;
            let result = match op {
                BinaryOperator::Equal => ordering == Ordering::Equal,
                BinaryOperator::NotEqual => ordering != Ordering::Equal,
                BinaryOperator::Less => ordering == Ordering::Less,
                BinaryOperator::Greater => ordering == Ordering::Greater,
                BinaryOperator::LessEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterEqual => ordering != Ordering::Less,
                BinaryOperator::And | BinaryOperator::Or => {
                    bail!("{:?} is not a comparison", op)
                }
            };
            Ok(Value::Boolean(result))
        }
    }
}

/// Compare two non-NULL values; `None` when the types are not comparable
pub fn compare_non_null(v1: &Value, v2: &Value) -> Option<Ordering> {
    match (v1, v2) {
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(a), other) => integral(other).map(|b| Value::epoch_day(*a).cmp(&b)),
        (other, Value::Date(b)) => integral(other).map(|a| a.cmp(&Value::epoch_day(*b))),
        (a, b) => match (integral(a), integral(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => {
                let a = numeric(a)?;
                let b = numeric(b)?;
                a.partial_cmp(&b)
            }
        },
    }
}

/// Ordering used by ORDER BY: NULLs sort first
pub fn compare_values(v1: &Value, v2: &Value) -> Ordering {
    match (v1, v2) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (v1, v2) => compare_non_null(v1, v2).unwrap_or_else(|| v1.type_name().cmp(v2.type_name())),
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(v) => Some(i64::from(*v)),
        Value::Long(v) => Some(*v),
        _ => None,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(f64::from(*v)),
        Value::Long(v) => Some(*v as f64),
        Value::Double(v) => Some(*v),
        _ => None,
    }
}

/// SQL LIKE with `%` (any run) and `_` (any single character). A character
/// after `escape` matches itself.
pub fn like_match(text: &str, pattern: &str, escape: Option<char>) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern = like_pattern(pattern, escape);

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(LikeItem::One) => {
                t += 1;
                p += 1;
                continue;
            }
            Some(LikeItem::Literal(c)) if *c == text[t] => {
                t += 1;
                p += 1;
                continue;
            }
            Some(LikeItem::Any) => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            _ => {}
        }
        match backtrack {
            Some((star, matched)) => {
                p = star + 1;
                t = matched + 1;
                backtrack = Some((star, matched + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|item| *item == LikeItem::Any)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeItem {
    Any,
    One,
    Literal(char),
}

fn like_pattern(pattern: &str, escape: Option<char>) -> Vec<LikeItem> {
    let mut items = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let item = match c {
            c if Some(c) == escape => LikeItem::Literal(chars.next().unwrap_or(c)),
            '%' => LikeItem::Any,
            '_' => LikeItem::One,
            c => LikeItem::Literal(c),
        };
        items.push(item);
    }
    items
}
