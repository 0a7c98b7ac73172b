//! Row selection criteria.
//!
//! A `Criteria` is a conjunction of simple per-column predicates. Executors
//! decide how to evaluate or render it.

use crate::row::Row;
use crate::value::Value;
use std::cmp::Ordering;

/// Comparison operator for a single-column condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// One predicate over one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: Comparison,
        value: Value,
    },
    IsNull {
        column: String,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Condition::Compare { column, .. }
            | Condition::IsNull { column }
            | Condition::In { column, .. } => column,
        }
    }

    /// Evaluate against a row. A missing column counts as NULL.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get_by_name(self.column()).unwrap_or(&Value::Null);
        match self {
            Condition::IsNull { .. } => actual.is_null(),
            Condition::In { values, .. } => values.iter().any(|v| actual.loosely_equals(v)),
            Condition::Compare { op, value, .. } => match op {
                Comparison::Eq => actual.loosely_equals(value),
                Comparison::Ne => !actual.is_null() && !actual.loosely_equals(value),
                Comparison::Lt => compare(actual, value) == Some(Ordering::Less),
                Comparison::Le => matches!(
                    compare(actual, value),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                Comparison::Gt => compare(actual, value) == Some(Ordering::Greater),
                Comparison::Ge => matches!(
                    compare(actual, value),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
            },
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a.to_text(), b.to_text()) {
            (Some(x), Some(y)) => {
                // Numeric text compares as a number.
                match (x.parse::<f64>(), y.parse::<f64>()) {
                    (Ok(nx), Ok(ny)) => nx.partial_cmp(&ny),
                    _ => Some(x.cmp(&y)),
                }
            }
            _ => None,
        },
    }
}

/// A conjunction of conditions. The empty criteria matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    conditions: Vec<Condition>,
}

impl Criteria {
    /// Criteria matching every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build equality criteria from a flat column/value mapping.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablerow_core::{Criteria, Value};
    ///
    /// let criteria = Criteria::from_pairs([("id", Value::BigInt(7))]);
    /// assert_eq!(criteria.len(), 1);
    /// ```
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        pairs
            .into_iter()
            .fold(Self::all(), |criteria, (column, value)| criteria.eq(column, value))
    }

    /// Add a raw condition.
    #[must_use]
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn compare(self, column: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        self.and(Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Eq, value)
    }

    #[must_use]
    pub fn ne(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Ne, value)
    }

    #[must_use]
    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Lt, value)
    }

    #[must_use]
    pub fn le(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Le, value)
    }

    #[must_use]
    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Gt, value)
    }

    #[must_use]
    pub fn ge(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Ge, value)
    }

    #[must_use]
    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.and(Condition::IsNull {
            column: column.into(),
        })
    }

    #[must_use]
    pub fn is_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.and(Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Value of the first equality condition on `column`, if any.
    pub fn equality_value(&self, column: &str) -> Option<&Value> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Compare {
                column: name,
                op: Comparison::Eq,
                value,
            } if name == column => Some(value),
            _ => None,
        })
    }

    /// Check whether every condition holds for the row.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}
