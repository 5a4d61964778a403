use thiserror::Error;

/// Client-side mistakes detected while compiling SQL clauses.
///
/// None of these ever reach the database: they are raised before any
/// statement is executed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    #[error("No data to update")]
    EmptyUpdate,

    #[error("Field '{0}' cannot be updated")]
    BadField(String),

    #[error("Invalid value for '{field}': {reason}")]
    BadValue { field: String, reason: String },

    #[error("{lower} cannot be greater than {upper}")]
    InvalidRange { lower: &'static str, upper: &'static str },
}

impl SqlError {
    pub fn bad_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SqlError::BadValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
