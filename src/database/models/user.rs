use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require_text, FieldErrors};

/// Longest username the `users.username` column accepts.
pub const MAX_USERNAME_LEN: usize = 25;

pub const MIN_PASSWORD_LEN: usize = 5;

/// A user as returned by the API. The password hash never leaves the
/// repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
    /// Ids of the jobs applied to; only present when there is at least one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<i32>>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "username", &self.username, Some(MAX_USERNAME_LEN));
        require_text(&mut errors, "firstName", &self.first_name, None);
        require_text(&mut errors, "lastName", &self.last_name, None);
        check_password(&mut errors, &self.password);
        check_email(&mut errors, &self.email);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// `POST /auth/token` body.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Field checks for a `PATCH /users/:username` body.
pub fn validate_changes(fields: &Map<String, Value>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for (field, value) in fields {
        match (field.as_str(), value) {
            ("firstName" | "lastName", Value::String(s)) => require_text(&mut errors, field, s, None),
            ("password", Value::String(s)) => check_password(&mut errors, s),
            ("email", Value::String(s)) => check_email(&mut errors, s),
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            "password".to_string(),
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.insert("email".to_string(), "must be an email address".to_string());
    }
}
