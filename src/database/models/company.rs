use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::job::Job;
use super::{present, require_text, FieldErrors};
use crate::sql::{Criterion, FilterSpec};

/// Longest handle the `companies.handle` column accepts.
pub const MAX_HANDLE_LEN: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
    /// Only present when the company has at least one job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<Job>>,
}

/// A company as returned by listings.
///
/// `num_employees` is `None` when the column was not selected, and
/// `Some(None)` when it was selected but is NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub handle: String,
    pub name: String,
    pub description: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub num_employees: Option<Option<i32>>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub num_employees: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl NewCompany {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "handle", &self.handle, Some(MAX_HANDLE_LEN));
        if self.handle != self.handle.to_lowercase() {
            errors.insert("handle".to_string(), "must be lowercase".to_string());
        }
        require_text(&mut errors, "name", &self.name, None);
        if matches!(self.num_employees, Some(n) if n < 0) {
            errors.insert("numEmployees".to_string(), "must not be negative".to_string());
        }
        if let Some(logo) = &self.logo_url {
            if url::Url::parse(logo).is_err() {
                errors.insert("logoUrl".to_string(), "must be a valid URL".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Field checks for a `PATCH /companies/:handle` body.
///
/// Only values that can be inspected here are checked; type mismatches and
/// unknown fields are left to the update compiler.
pub fn validate_changes(fields: &Map<String, Value>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for (field, value) in fields {
        match (field.as_str(), value) {
            ("name" | "description", Value::String(s)) => require_text(&mut errors, field, s, None),
            ("numEmployees", Value::Number(n)) if n.as_i64().map_or(false, |n| n < 0) => {
                errors.insert(field.clone(), "must not be negative".to_string());
            }
            ("logoUrl", Value::String(s)) if url::Url::parse(s).is_err() => {
                errors.insert(field.clone(), "must be a valid URL".to_string());
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Search criteria accepted by `GET /companies`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyFilter {
    pub min_employees: Option<i64>,
    pub max_employees: Option<i64>,
    pub name_like: Option<String>,
}

impl CompanyFilter {
    pub fn is_empty(&self) -> bool {
        self.min_employees.is_none()
            && self.max_employees.is_none()
            && self.name_like.as_deref().map_or(true, str::is_empty)
    }

    pub fn filters_employees(&self) -> bool {
        self.min_employees.is_some() || self.max_employees.is_some()
    }
}

impl FilterSpec for CompanyFilter {
    fn criterion(&self, key: &str) -> Option<Criterion> {
        match key {
            "minEmployees" => self.min_employees.map(Criterion::Number),
            "maxEmployees" => self.max_employees.map(Criterion::Number),
            "nameLike" => self.name_like.clone().map(Criterion::Text),
            _ => None,
        }
    }
}
