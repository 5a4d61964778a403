use serde_json::{Map, Value};
use tracing::debug;

use super::{decode, decode_all, ModelError};
use crate::database::executor::Executor;
use crate::database::models::{Job, JobFilter, NewJob};
use crate::sql::{
    compile_filter, compile_update, ColumnKind, FieldMap, FilterGrammar, FilterRule, NullPolicy, PredicateKind,
    SqlValue, UpdateField, UpdateSpec,
};

/// Select list for a job row. Equity is read back as text so the stored
/// decimal is returned digit for digit.
pub const JOB_COLUMNS: &str = r#"id, title, salary, equity::text AS equity, company_handle AS "companyHandle""#;

/// Job fields already match their column names.
pub const JOB_FIELDS: FieldMap = FieldMap::IDENTITY;

/// Fields a job update may touch. The id and company are immutable.
pub const JOB_UPDATE_FIELDS: &[UpdateField] = &[
    UpdateField::new("title", ColumnKind::Text),
    UpdateField::nullable("salary", ColumnKind::Integer),
    UpdateField::nullable("equity", ColumnKind::Numeric),
];

pub const JOB_NULLS: NullPolicy = NullPolicy::Skip;

pub const JOB_FILTERS: FilterGrammar = FilterGrammar {
    rules: &[
        FilterRule::new("title", "title", PredicateKind::Contains),
        FilterRule::new("minSalary", "salary", PredicateKind::GreaterThan),
        FilterRule::new("hasEquity", "equity", PredicateKind::Positive),
    ],
    ranges: &[],
};

/// Jobs are addressed by title.
pub struct JobRepository<'a> {
    db: &'a dyn Executor,
}

impl<'a> JobRepository<'a> {
    pub fn new(db: &'a dyn Executor) -> Self {
        Self { db }
    }

    pub async fn create(&self, job: &NewJob) -> Result<Job, ModelError> {
        let existing = self
            .db
            .fetch_optional("SELECT title FROM jobs WHERE title = $1", &[SqlValue::from(job.title.as_str())])
            .await?;
        if existing.is_some() {
            return Err(ModelError::duplicate("job", &job.title));
        }

        let sql = format!(
            "INSERT INTO jobs (title, salary, equity, company_handle)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            JOB_COLUMNS
        );
        let params = [
            SqlValue::from(job.title.as_str()),
            SqlValue::Integer(job.salary.map(i64::from)),
            SqlValue::Numeric(job.equity),
            SqlValue::from(job.company_handle.as_str()),
        ];
        let row = self
            .db
            .fetch_optional(&sql, &params)
            .await
            .map_err(|e| ModelError::on_write(e, "job", &job.title))?
            .ok_or_else(|| ModelError::not_found("job", &job.title))?;

        debug!(title = %job.title, company = %job.company_handle, "job created");
        decode(row)
    }

    pub async fn get(&self, title: &str) -> Result<Job, ModelError> {
        let sql = format!("SELECT {} FROM jobs WHERE title = $1", JOB_COLUMNS);
        let row = self
            .db
            .fetch_optional(&sql, &[SqlValue::from(title)])
            .await?
            .ok_or_else(|| ModelError::not_found("job", title))?;
        decode(row)
    }

    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, ModelError> {
        let clause = compile_filter(filter, &JOB_FILTERS)?;
        let sql = format!("SELECT {} FROM jobs {} ORDER BY title", JOB_COLUMNS, clause.sql);
        decode_all(self.db.fetch_all(&sql, &clause.params).await?)
    }

    /// Apply a partial update. Null values are dropped, so `{salary: null}`
    /// alone is an empty update. A rename onto another job's title is a
    /// duplicate.
    pub async fn update(&self, title: &str, fields: &Map<String, Value>) -> Result<Job, ModelError> {
        let spec = UpdateSpec::from_record(fields, JOB_UPDATE_FIELDS, JOB_NULLS)?;
        let set = compile_update(&spec, &JOB_FIELDS)?;

        let new_title = fields.get("title").and_then(Value::as_str).filter(|t| *t != title);
        if let Some(new_title) = new_title {
            let taken = self
                .db
                .fetch_optional("SELECT title FROM jobs WHERE title = $1", &[SqlValue::from(new_title)])
                .await?;
            if taken.is_some() {
                return Err(ModelError::duplicate("job", new_title));
            }
        }

        let sql = format!(
            "UPDATE jobs SET {} WHERE title = {} RETURNING {}",
            set.sql,
            set.next_placeholder(),
            JOB_COLUMNS
        );
        let mut params = set.params;
        params.push(SqlValue::from(title));

        let row = self
            .db
            .fetch_optional(&sql, &params)
            .await
            .map_err(|e| ModelError::on_write(e, "job", new_title.unwrap_or(title)))?
            .ok_or_else(|| ModelError::not_found("job", title))?;
        decode(row)
    }

    pub async fn remove(&self, title: &str) -> Result<(), ModelError> {
        self.db
            .fetch_optional("DELETE FROM jobs WHERE title = $1 RETURNING title", &[SqlValue::from(title)])
            .await?
            .ok_or_else(|| ModelError::not_found("job", title))?;
        debug!(title, "job removed");
        Ok(())
    }
}
