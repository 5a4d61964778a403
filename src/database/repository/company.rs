use serde_json::{Map, Value};
use tracing::debug;

use super::{decode, decode_all, ModelError};
use crate::database::executor::Executor;
use crate::database::models::{Company, CompanyFilter, CompanySummary, Job, NewCompany};
use crate::database::repository::job::JOB_COLUMNS;
use crate::sql::{
    compile_filter, compile_update, select_list, ColumnKind, FieldMap, FilterGrammar, FilterRule, NullPolicy,
    PredicateKind, SqlValue, UpdateField, UpdateSpec,
};

pub const COMPANY_FIELDS: FieldMap = FieldMap(&[("numEmployees", "num_employees"), ("logoUrl", "logo_url")]);

/// Fields a company update may touch. The handle is immutable.
pub const COMPANY_UPDATE_FIELDS: &[UpdateField] = &[
    UpdateField::new("name", ColumnKind::Text),
    UpdateField::new("description", ColumnKind::Text),
    UpdateField::nullable("numEmployees", ColumnKind::Integer),
    UpdateField::nullable("logoUrl", ColumnKind::Text),
];

pub const COMPANY_NULLS: NullPolicy = NullPolicy::Include;

pub const COMPANY_FILTERS: FilterGrammar = FilterGrammar {
    rules: &[
        FilterRule::new("maxEmployees", "num_employees", PredicateKind::AtMost),
        FilterRule::new("minEmployees", "num_employees", PredicateKind::AtLeast),
        FilterRule::new("nameLike", "name", PredicateKind::Contains),
    ],
    ranges: &[("minEmployees", "maxEmployees")],
};

const COMPANY_COLUMNS: &[&str] = &["handle", "name", "description", "num_employees", "logo_url"];
const SUMMARY_WITHOUT_SIZE: &[&str] = &["handle", "name", "description", "logo_url"];

/// Columns a listing returns for `filter`.
///
/// The employee count is part of the result for an unfiltered listing or when
/// the filter bounds it, and left out for a name-only search.
pub fn selectable_columns(filter: &CompanyFilter) -> &'static [&'static str] {
    if filter.is_empty() || filter.filters_employees() {
        COMPANY_COLUMNS
    } else {
        SUMMARY_WITHOUT_SIZE
    }
}

pub struct CompanyRepository<'a> {
    db: &'a dyn Executor,
}

impl<'a> CompanyRepository<'a> {
    pub fn new(db: &'a dyn Executor) -> Self {
        Self { db }
    }

    pub async fn create(&self, company: &NewCompany) -> Result<Company, ModelError> {
        let existing = self
            .db
            .fetch_optional("SELECT handle FROM companies WHERE handle = $1", &[SqlValue::from(company.handle.as_str())])
            .await?;
        if existing.is_some() {
            return Err(ModelError::duplicate("company", &company.handle));
        }

        let sql = format!(
            "INSERT INTO companies (handle, name, description, num_employees, logo_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            select_list(COMPANY_COLUMNS, &COMPANY_FIELDS)
        );
        let params = [
            SqlValue::from(company.handle.as_str()),
            SqlValue::from(company.name.as_str()),
            SqlValue::from(company.description.as_str()),
            SqlValue::Integer(company.num_employees.map(i64::from)),
            SqlValue::Text(company.logo_url.clone()),
        ];
        let row = self
            .db
            .fetch_optional(&sql, &params)
            .await
            .map_err(|e| ModelError::on_write(e, "company", &company.handle))?
            .ok_or_else(|| ModelError::not_found("company", &company.handle))?;

        debug!(handle = %company.handle, "company created");
        decode(row)
    }

    /// A company with its jobs; `jobs` stays unset when there are none.
    pub async fn get(&self, handle: &str) -> Result<Company, ModelError> {
        let sql = format!(
            "SELECT {} FROM companies WHERE handle = $1",
            select_list(COMPANY_COLUMNS, &COMPANY_FIELDS)
        );
        let row = self
            .db
            .fetch_optional(&sql, &[SqlValue::from(handle)])
            .await?
            .ok_or_else(|| ModelError::not_found("company", handle))?;
        let mut company: Company = decode(row)?;

        let jobs_sql = format!("SELECT {} FROM jobs WHERE company_handle = $1 ORDER BY id", JOB_COLUMNS);
        let jobs: Vec<Job> = decode_all(self.db.fetch_all(&jobs_sql, &[SqlValue::from(handle)]).await?)?;
        if !jobs.is_empty() {
            company.jobs = Some(jobs);
        }
        Ok(company)
    }

    pub async fn list(&self, filter: &CompanyFilter) -> Result<Vec<CompanySummary>, ModelError> {
        let clause = compile_filter(filter, &COMPANY_FILTERS)?;
        let sql = format!(
            "SELECT {} FROM companies {} ORDER BY name",
            select_list(selectable_columns(filter), &COMPANY_FIELDS),
            clause.sql
        );
        decode_all(self.db.fetch_all(&sql, &clause.params).await?)
    }

    /// Apply a partial update. Explicit nulls clear nullable columns.
    pub async fn update(&self, handle: &str, fields: &Map<String, Value>) -> Result<Company, ModelError> {
        let spec = UpdateSpec::from_record(fields, COMPANY_UPDATE_FIELDS, COMPANY_NULLS)?;
        let set = compile_update(&spec, &COMPANY_FIELDS)?;

        let sql = format!(
            "UPDATE companies SET {} WHERE handle = {} RETURNING {}",
            set.sql,
            set.next_placeholder(),
            select_list(COMPANY_COLUMNS, &COMPANY_FIELDS)
        );
        let mut params = set.params;
        params.push(SqlValue::from(handle));

        let name = fields.get("name").and_then(Value::as_str).unwrap_or(handle);
        let row = self
            .db
            .fetch_optional(&sql, &params)
            .await
            .map_err(|e| ModelError::on_write(e, "company", name))?
            .ok_or_else(|| ModelError::not_found("company", handle))?;
        decode(row)
    }

    pub async fn remove(&self, handle: &str) -> Result<(), ModelError> {
        self.db
            .fetch_optional("DELETE FROM companies WHERE handle = $1 RETURNING handle", &[SqlValue::from(handle)])
            .await?
            .ok_or_else(|| ModelError::not_found("company", handle))?;
        debug!(handle, "company removed");
        Ok(())
    }
}
