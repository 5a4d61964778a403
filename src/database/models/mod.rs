pub mod company;
pub mod job;
pub mod user;

pub use company::{Company, CompanyFilter, CompanySummary, NewCompany};
pub use job::{Job, JobFilter, NewJob};
pub use user::{Credentials, NewUser, User};

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Per-field validation messages for a rejected payload.
pub type FieldErrors = HashMap<String, String>;

/// Deserialize a present key (even `null`) as `Some`, so a missing key and
/// an explicit null stay distinguishable in `Option<Option<T>>` fields.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn require_text(errors: &mut FieldErrors, field: &str, value: &str, max_len: Option<usize>) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), "must not be empty".to_string());
    } else if let Some(max) = max_len {
        if value.chars().count() > max {
            errors.insert(field.to_string(), format!("must be at most {} characters", max));
        }
    }
}
