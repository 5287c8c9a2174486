//! Row filters.
//!
//! A [`Predicate`] is a small boolean expression over entity fields. It is
//! rendered to SQL with positional parameters; column names are checked
//! against the entity's field registry before they reach the SQL text.

use std::fmt;
use std::ops::Not;

use super::{Entity, FieldValue, Result};

/// Comparison operators.
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
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A boolean condition over entity fields.
///
/// ```
/// use kvdao_core::storage::Predicate;
///
/// let filter = Predicate::eq("status", "active").and(Predicate::gt("age", 17));
/// assert_eq!(filter.to_string(), "(status = 'active' AND age > 17)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    All,
    Compare {
        column: String,
        op: Comparison,
        value: FieldValue,
    },
    IsNull(String),
    IsNotNull(String),
    In {
        column: String,
        values: Vec<FieldValue>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    fn compare(column: impl Into<String>, op: Comparison, value: impl Into<FieldValue>) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`. Comparing with `Null` renders `IS NULL`.
    pub fn eq(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(column, Comparison::Eq, value)
    }

    /// `column <> value`. Comparing with `Null` renders `IS NOT NULL`.
    pub fn ne(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(column, Comparison::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(column, Comparison::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(column, Comparison::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(column, Comparison::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(column, Comparison::Ge, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull(column.into())
    }

    pub fn in_list<V: Into<FieldValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Column names referenced by this predicate.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::All => {}
            Self::Compare { column, .. }
            | Self::IsNull(column)
            | Self::IsNotNull(column)
            | Self::In { column, .. } => out.push(column),
            Self::And(parts) | Self::Or(parts) => {
                parts.iter().for_each(|p| p.collect_columns(out));
            }
            Self::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Renders the predicate as a SQL boolean expression for entity `E`.
    ///
    /// Parameters are appended to `params` in placeholder order.
    pub fn to_sql<E: Entity>(&self, params: &mut Vec<FieldValue>) -> Result<String> {
        for column in self.columns() {
            E::fields().require(column)?;
        }
        Ok(self.render(params))
    }

    fn render(&self, params: &mut Vec<FieldValue>) -> String {
        match self {
            Self::All => "1 = 1".to_string(),
            Self::Compare { column, op, value } => match (op, value) {
                (Comparison::Eq, FieldValue::Null) => format!("{} IS NULL", quote(column)),
                (Comparison::Ne, FieldValue::Null) => format!("{} IS NOT NULL", quote(column)),
                _ => {
                    params.push(value.clone());
                    format!("{} {} ?", quote(column), op.as_sql())
                }
            },
            Self::IsNull(column) => format!("{} IS NULL", quote(column)),
            Self::IsNotNull(column) => format!("{} IS NOT NULL", quote(column)),
            Self::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
            Self::In { column, values } => {
                params.extend(values.iter().cloned());
                let marks = vec!["?"; values.len()].join(", ");
                format!("{} IN ({marks})", quote(column))
            }
            Self::And(parts) => join(parts, " AND ", "1 = 1", params),
            Self::Or(parts) => join(parts, " OR ", "1 = 0", params),
            Self::Not(inner) => format!("NOT ({})", inner.render(params)),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}

fn join(parts: &[Predicate], sep: &str, empty: &str, params: &mut Vec<FieldValue>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts.iter().map(|p| p.render(params)).collect();
    format!("({})", rendered.join(sep))
}

/// Quotes an identifier for SQL.
pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("TRUE"),
            Self::Compare { column, op, value } => write!(f, "{column} {} {value}", op.as_sql()),
            Self::IsNull(column) => write!(f, "{column} IS NULL"),
            Self::IsNotNull(column) => write!(f, "{column} IS NOT NULL"),
            Self::In { column, values } => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{column} IN ({})", items.join(", "))
            }
            Self::And(parts) | Self::Or(parts) => {
                let sep = if matches!(self, Self::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                let items: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "({})", items.join(sep))
            }
            Self::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}
