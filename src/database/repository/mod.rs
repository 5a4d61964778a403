pub mod company;
pub mod job;
pub mod user;

pub use company::CompanyRepository;
pub use job::JobRepository;
pub use user::UserRepository;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::database::executor::JsonRow;
use crate::database::manager::DatabaseError;
use crate::sql::SqlError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Query(#[from] SqlError),

    #[error("No {entity}: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("Invalid username/password")]
    InvalidCredentials,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ModelError {
    fn not_found(entity: &'static str, key: &str) -> Self {
        Self::NotFound { entity, key: key.to_string() }
    }

    fn duplicate(entity: &'static str, key: &str) -> Self {
        Self::Duplicate { entity, key: key.to_string() }
    }

    /// Turn a unique-constraint failure from an insert or update into `Duplicate`.
    fn on_write(err: DatabaseError, entity: &'static str, key: &str) -> Self {
        match &err {
            DatabaseError::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Self::duplicate(entity, key)
            }
            _ => Self::Database(err),
        }
    }
}

fn decode<T: DeserializeOwned>(row: JsonRow) -> Result<T, ModelError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn decode_all<T: DeserializeOwned>(rows: Vec<JsonRow>) -> Result<Vec<T>, ModelError> {
    rows.into_iter().map(decode).collect()
}
