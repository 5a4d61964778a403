#![allow(dead_code)]

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor as _, PgPool};

use jobly_api::auth::{PasswordHasher, Sha256Hasher};
use jobly_api::database::manager::SCHEMA_SQL;

/// Hasher used for seeded passwords; stored hashes carry their own rounds.
pub const HASHER: Sha256Hasher = Sha256Hasher::new(1);

const SEED_SQL: &str = r#"
INSERT INTO companies (handle, name, num_employees, description, logo_url)
VALUES ('c1', 'C1', 1, 'Desc1', 'http://c1.img'),
       ('c2', 'C2', 2, 'Desc2', 'http://c2.img'),
       ('c3', 'C3', 3, 'Desc3', 'http://c3.img');

INSERT INTO jobs (title, salary, equity, company_handle)
VALUES ('j1', 110000, 0, 'c1'),
       ('j2', 200000, 0, 'c2'),
       ('j3', 55000, 0, 'c3'),
       ('j4', 89000, 0.043, 'c2');
"#;

/// Users u1..u3 (`password1`..`password3`, only u3 is an admin) and one
/// application from u2 to j4.
async fn seed_users(pool: &PgPool) -> Result<()> {
    for (n, is_admin) in [(1, false), (2, false), (3, true)] {
        sqlx::query(
            "INSERT INTO users (username, password, first_name, last_name, email, is_admin)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(format!("u{}", n))
        .bind(HASHER.hash(&format!("password{}", n)))
        .bind(format!("U{}F", n))
        .bind(format!("U{}L", n))
        .bind(format!("user{}@user.com", n))
        .bind(is_admin)
        .execute(pool)
        .await?;
    }
    pool.execute("INSERT INTO applications (username, job_id) SELECT 'u2', id FROM jobs WHERE title = 'j4'")
        .await?;
    Ok(())
}

/// A seeded, throw-away schema. Call [`TestDb::cleanup`] at the end of a test.
pub struct TestDb {
    pub pool: PgPool,
    schema: String,
    admin: PgPool,
}

impl TestDb {
    /// `None` (with a note on stderr) when `DATABASE_URL` is not set.
    pub async fn seeded() -> Result<Option<Self>> {
        let _ = dotenvy::dotenv();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return Ok(None);
        };

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&url)
            .await
            .context("failed to connect to DATABASE_URL")?;

        let schema = format!("jobly_test_{}", uuid::Uuid::new_v4().simple());
        admin.execute(format!("CREATE SCHEMA {}", schema).as_str()).await?;

        let search_path = format!("SET search_path TO {}", schema);
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await?;

        pool.execute(SCHEMA_SQL).await?;
        pool.execute(SEED_SQL).await?;
        seed_users(&pool).await?;

        Ok(Some(Self { pool, schema, admin }))
    }

    pub async fn cleanup(self) -> Result<()> {
        self.pool.close().await;
        self.admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await?;
        Ok(())
    }
}
