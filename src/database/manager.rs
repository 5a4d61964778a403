use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Executor as _, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the storage layer. These are server-side failures and are
/// never reclassified as client errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Unexpected row shape: {0}")]
    RowShape(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Table definitions applied by `jobly schema` and the integration tests.
pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub struct DatabaseManager;

impl DatabaseManager {
    /// Connect using `DATABASE_URL` and the pool settings from config.
    pub async fn connect(settings: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        Self::connect_to(&url, settings).await
    }

    pub async fn connect_to(url: &str, settings: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool for {}{} (max {} connections)",
            parsed.host_str().unwrap_or("localhost"),
            parsed.path(),
            settings.max_connections
        );
        Ok(pool)
    }

    /// Create the tables if they do not exist yet.
    pub async fn apply_schema(pool: &PgPool) -> Result<(), DatabaseError> {
        // Unprepared execution so the multi-statement script runs as one batch
        pool.execute(SCHEMA_SQL).await?;
        info!("Database schema applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
