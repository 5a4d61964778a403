use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::error::SqlError;

/// A typed, nullable statement parameter.
///
/// Nulls keep their column type so Postgres sees e.g. an `int8` NULL rather
/// than an untyped text NULL when assigning to an integer column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Float(Option<f64>),
    Numeric(Option<Decimal>),
    Boolean(Option<bool>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Integer(v) => v.is_none(),
            SqlValue::Float(v) => v.is_none(),
            SqlValue::Numeric(v) => v.is_none(),
            SqlValue::Boolean(v) => v.is_none(),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(Some(v))
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(Some(i64::from(v)))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(Some(v))
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Numeric(Some(v))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Boolean(Some(v))
    }
}

/// Storage type of an updatable column, used to coerce incoming JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Numeric,
    Boolean,
}

impl ColumnKind {
    pub fn null(self) -> SqlValue {
        match self {
            ColumnKind::Text => SqlValue::Text(None),
            ColumnKind::Integer => SqlValue::Integer(None),
            ColumnKind::Numeric => SqlValue::Numeric(None),
            ColumnKind::Boolean => SqlValue::Boolean(None),
        }
    }

    /// Convert a JSON value into a parameter for a column of this kind.
    ///
    /// Null maps to a typed NULL; nullability is checked by the caller.
    pub fn coerce(self, field: &str, value: &Value) -> Result<SqlValue, SqlError> {
        if value.is_null() {
            return Ok(self.null());
        }

        match (self, value) {
            (ColumnKind::Text, Value::String(s)) => Ok(SqlValue::Text(Some(s.clone()))),
            (ColumnKind::Integer, Value::Number(n)) => match n.as_i64() {
                Some(v) => i32::try_from(v)
                    .map(SqlValue::from)
                    .map_err(|_| SqlError::bad_value(field, "expected a 32-bit integer")),
                None => Err(SqlError::bad_value(field, "expected an integer")),
            },
            (ColumnKind::Numeric, Value::String(s)) => Decimal::from_str(s.trim())
                .map(SqlValue::from)
                .map_err(|_| SqlError::bad_value(field, "expected a decimal number")),
            (ColumnKind::Numeric, Value::Number(n)) => Decimal::from_str(&n.to_string())
                .map(SqlValue::from)
                .map_err(|_| SqlError::bad_value(field, "expected a decimal number")),
            (ColumnKind::Boolean, Value::Bool(b)) => Ok(SqlValue::from(*b)),
            (kind, _) => Err(SqlError::bad_value(
                field,
                format!("expected {}", kind.describe()),
            )),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ColumnKind::Text => "a string",
            ColumnKind::Integer => "an integer",
            ColumnKind::Numeric => "a decimal number",
            ColumnKind::Boolean => "a boolean",
        }
    }
}

/// SQL fragment with `$n` placeholders and the parameters bound to them.
///
/// `params[i]` is bound to placeholder `$(first_index + i)`; `next_index` is
/// the placeholder a caller should use for anything appended afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledClause {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub next_index: usize,
}

impl CompiledClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Placeholder text for the next parameter, e.g. `$5`.
    pub fn next_placeholder(&self) -> String {
        format!("${}", self.next_index)
    }
}
