use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, PgPool, Postgres, Row};

use crate::database::manager::DatabaseError;
use crate::sql::SqlValue;

/// A JSON object per returned row, keyed by column name (or alias).
pub type JsonRow = Map<String, Value>;

/// Runs parameterized statements for the repositories.
///
/// `sql` only ever contains `$n` placeholders and allow-listed identifiers;
/// escaping of `params` is entirely the implementation's job.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<JsonRow>, DatabaseError>;

    async fn fetch_optional(&self, sql: &str, params: &[SqlValue]) -> Result<Option<JsonRow>, DatabaseError> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }
}

#[async_trait]
impl Executor for PgPool {
    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<JsonRow>, DatabaseError> {
        let settings = &crate::config::config().database;
        if settings.enable_query_logging {
            tracing::debug!(sql = %sql.trim(), params = ?params, "executing query");
        }

        // Works for SELECT as well as INSERT/UPDATE/DELETE ... RETURNING
        let wrapped = format!("WITH t AS ({}) SELECT row_to_json(t) AS row FROM t", sql);
        let mut q = sqlx::query(&wrapped);
        for p in params {
            q = bind_param(q, p);
        }

        let started = Instant::now();
        let rows = q.fetch_all(self).await?;
        let elapsed = started.elapsed();
        if elapsed.as_millis() > u128::from(settings.slow_query_threshold_ms) {
            tracing::warn!(sql = %sql.trim(), elapsed_ms = elapsed.as_millis() as u64, "slow query");
        }

        rows.iter()
            .map(|row| match row.try_get::<Value, _>("row")? {
                Value::Object(map) => Ok(map),
                other => Err(DatabaseError::RowShape(other.to_string())),
            })
            .collect()
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &SqlValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        SqlValue::Text(s) => q.bind(s.clone()),
        SqlValue::Integer(i) => q.bind(*i),
        SqlValue::Float(f) => q.bind(*f),
        SqlValue::Numeric(d) => q.bind(*d),
        SqlValue::Boolean(b) => q.bind(*b),
    }
}
