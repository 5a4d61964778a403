use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use super::{require_text, FieldErrors};
use crate::sql::{Criterion, FilterSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub salary: Option<i32>,
    #[serde(default)]
    pub equity: Option<Decimal>,
    #[serde(alias = "company_handle")]
    pub company_handle: String,
}

impl NewJob {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "title", &self.title, None);
        require_text(&mut errors, "companyHandle", &self.company_handle, Some(super::company::MAX_HANDLE_LEN));
        if matches!(self.salary, Some(s) if s < 0) {
            errors.insert("salary".to_string(), "must not be negative".to_string());
        }
        if let Some(equity) = self.equity {
            if equity < Decimal::ZERO || equity > Decimal::ONE {
                errors.insert("equity".to_string(), "must be between 0 and 1".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn equity_in_range(value: &Value) -> bool {
    let parsed = match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    };
    parsed.map_or(true, |d| d >= Decimal::ZERO && d <= Decimal::ONE)
}

/// Field checks for a `PATCH /jobs/:title` body.
pub fn validate_changes(fields: &Map<String, Value>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for (field, value) in fields {
        match (field.as_str(), value) {
            ("title", Value::String(s)) => require_text(&mut errors, field, s, None),
            ("salary", Value::Number(n)) if n.as_i64().map_or(false, |n| n < 0) => {
                errors.insert(field.clone(), "must not be negative".to_string());
            }
            ("equity", v) if !equity_in_range(v) => {
                errors.insert(field.clone(), "must be between 0 and 1".to_string());
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

/// Search criteria accepted by `GET /jobs`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobFilter {
    pub title: Option<String>,
    pub min_salary: Option<i64>,
    pub has_equity: Option<bool>,
}

impl FilterSpec for JobFilter {
    fn criterion(&self, key: &str) -> Option<Criterion> {
        match key {
            "title" => self.title.clone().map(Criterion::Text),
            "minSalary" => self.min_salary.map(Criterion::Number),
            "hasEquity" => self.has_equity.map(Criterion::Flag),
            _ => None,
        }
    }
}
