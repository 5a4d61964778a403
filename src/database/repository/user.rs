use serde_json::{Map, Value};
use tracing::debug;

use super::{decode, decode_all, ModelError};
use crate::auth::PasswordHasher;
use crate::database::executor::Executor;
use crate::database::models::{NewUser, User};
use crate::sql::{compile_update, select_list, ColumnKind, FieldMap, NullPolicy, SqlValue, UpdateField, UpdateSpec};

pub const USER_FIELDS: FieldMap = FieldMap(&[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("isAdmin", "is_admin"),
]);

/// Fields a user update may touch. The username is immutable.
pub const USER_UPDATE_FIELDS: &[UpdateField] = &[
    UpdateField::new("firstName", ColumnKind::Text),
    UpdateField::new("lastName", ColumnKind::Text),
    UpdateField::new("email", ColumnKind::Text),
    UpdateField::new("password", ColumnKind::Text),
    UpdateField::new("isAdmin", ColumnKind::Boolean),
];

pub const USER_NULLS: NullPolicy = NullPolicy::Include;

const USER_COLUMNS: &[&str] = &["username", "first_name", "last_name", "email", "is_admin"];

/// Users and their job applications. Passwords are hashed on the way in and
/// never selected back out, except by `authenticate`.
pub struct UserRepository<'a> {
    db: &'a dyn Executor,
    hasher: &'a dyn PasswordHasher,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a dyn Executor, hasher: &'a dyn PasswordHasher) -> Self {
        Self { db, hasher }
    }

    pub async fn register(&self, user: &NewUser) -> Result<User, ModelError> {
        let existing = self
            .db
            .fetch_optional("SELECT username FROM users WHERE username = $1", &[SqlValue::from(user.username.as_str())])
            .await?;
        if existing.is_some() {
            return Err(ModelError::duplicate("user", &user.username));
        }

        let sql = format!(
            "INSERT INTO users (username, password, first_name, last_name, email, is_admin)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            select_list(USER_COLUMNS, &USER_FIELDS)
        );
        let params = [
            SqlValue::from(user.username.as_str()),
            SqlValue::from(self.hasher.hash(&user.password)),
            SqlValue::from(user.first_name.as_str()),
            SqlValue::from(user.last_name.as_str()),
            SqlValue::from(user.email.as_str()),
            SqlValue::from(user.is_admin),
        ];
        let row = self
            .db
            .fetch_optional(&sql, &params)
            .await
            .map_err(|e| ModelError::on_write(e, "user", &user.username))?
            .ok_or_else(|| ModelError::not_found("user", &user.username))?;

        debug!(username = %user.username, admin = user.is_admin, "user registered");
        decode(row)
    }

    /// The user named `username` if `password` matches the stored hash.
    ///
    /// An unknown username and a wrong password fail the same way.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, ModelError> {
        let sql = format!(
            "SELECT {}, password FROM users WHERE username = $1",
            select_list(USER_COLUMNS, &USER_FIELDS)
        );
        let Some(mut row) = self.db.fetch_optional(&sql, &[SqlValue::from(username)]).await? else {
            return Err(ModelError::InvalidCredentials);
        };

        let stored = row.remove("password");
        let matches = stored
            .as_ref()
            .and_then(Value::as_str)
            .map_or(false, |hashed| self.hasher.verify(password, hashed));
        if !matches {
            debug!(username, "rejected credentials");
            return Err(ModelError::InvalidCredentials);
        }
        decode(row)
    }

    /// A user with the ids of the jobs they applied to.
    pub async fn get(&self, username: &str) -> Result<User, ModelError> {
        let sql = format!(
            "SELECT {} FROM users WHERE username = $1",
            select_list(USER_COLUMNS, &USER_FIELDS)
        );
        let row = self
            .db
            .fetch_optional(&sql, &[SqlValue::from(username)])
            .await?
            .ok_or_else(|| ModelError::not_found("user", username))?;
        let mut user: User = decode(row)?;

        let applied = self
            .db
            .fetch_all(
                "SELECT job_id FROM applications WHERE username = $1 ORDER BY job_id",
                &[SqlValue::from(username)],
            )
            .await?;
        let jobs: Vec<i32> = applied
            .iter()
            .filter_map(|row| row.get("job_id").and_then(Value::as_i64))
            .filter_map(|id| i32::try_from(id).ok())
            .collect();
        if !jobs.is_empty() {
            user.jobs = Some(jobs);
        }
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, ModelError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY username",
            select_list(USER_COLUMNS, &USER_FIELDS)
        );
        decode_all(self.db.fetch_all(&sql, &[]).await?)
    }

    /// Apply a partial update. A new password is hashed before it is stored.
    pub async fn update(&self, username: &str, fields: &Map<String, Value>) -> Result<User, ModelError> {
        let mut fields = fields.clone();
        if let Some(Value::String(password)) = fields.get("password") {
            let hashed = self.hasher.hash(password);
            fields.insert("password".to_string(), Value::String(hashed));
        }

        let spec = UpdateSpec::from_record(&fields, USER_UPDATE_FIELDS, USER_NULLS)?;
        let set = compile_update(&spec, &USER_FIELDS)?;

        let sql = format!(
            "UPDATE users SET {} WHERE username = {} RETURNING {}",
            set.sql,
            set.next_placeholder(),
            select_list(USER_COLUMNS, &USER_FIELDS)
        );
        let mut params = set.params;
        params.push(SqlValue::from(username));

        let row = self
            .db
            .fetch_optional(&sql, &params)
            .await?
            .ok_or_else(|| ModelError::not_found("user", username))?;
        decode(row)
    }

    pub async fn remove(&self, username: &str) -> Result<(), ModelError> {
        self.db
            .fetch_optional(
                "DELETE FROM users WHERE username = $1 RETURNING username",
                &[SqlValue::from(username)],
            )
            .await?
            .ok_or_else(|| ModelError::not_found("user", username))?;
        debug!(username, "user removed");
        Ok(())
    }

    /// Record that `username` applied to job `job_id`.
    pub async fn apply_to_job(&self, username: &str, job_id: i32) -> Result<(), ModelError> {
        self.db
            .fetch_optional("SELECT id FROM jobs WHERE id = $1", &[SqlValue::from(job_id)])
            .await?
            .ok_or_else(|| ModelError::not_found("job", &job_id.to_string()))?;
        self.db
            .fetch_optional("SELECT username FROM users WHERE username = $1", &[SqlValue::from(username)])
            .await?
            .ok_or_else(|| ModelError::not_found("user", username))?;

        let key = format!("{}/{}", username, job_id);
        self.db
            .fetch_optional(
                "INSERT INTO applications (username, job_id) VALUES ($1, $2) RETURNING job_id",
                &[SqlValue::from(username), SqlValue::from(job_id)],
            )
            .await
            .map_err(|e| ModelError::on_write(e, "application", &key))?;

        debug!(username, job_id, "application recorded");
        Ok(())
    }
}
