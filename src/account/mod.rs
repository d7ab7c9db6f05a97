/// Account management system
///
/// Handles user registration, password login and personal access tokens.

mod manager;
pub mod password;
pub mod token;

pub use manager::AccountManager;

use crate::db::account::User;
use crate::validation::{FieldErrors, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registration request body
///
/// Fields stay loosely typed so type mismatches are reported per field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub password: Option<Value>,
    pub password_confirmation: Option<Value>,
    pub is_admin: Option<Value>,
    pub employee_id: Option<Value>,
    pub department_code: Option<Value>,
    pub government_id: Option<Value>,
    pub phone: Option<Value>,
    pub date_of_birth: Option<Value>,
}

/// Registration data after validation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub employee_id: Option<String>,
    pub department_code: Option<String>,
    pub government_id: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Non-empty password; passwords are not trimmed
fn password_field<'v>(errors: &mut FieldErrors, value: &'v Option<Value>) -> Option<&'v str> {
    match errors.string("password", value)?.filter(|p| !p.is_empty()) {
        Some(password) => Some(password),
        None => {
            errors.add("password", "The password field is required.");
            None
        }
    }
}

impl Validate for RegisterRequest {
    type Output = NewUser;

    fn validate(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = errors
            .string("name", &self.name)
            .and_then(|v| errors.required("name", v));
        if let Some(name) = name {
            errors.max_chars("name", name, 255);
        }

        let email = errors
            .string("email", &self.email)
            .and_then(|v| errors.required("email", v));
        if let Some(email) = email {
            if errors.email("email", email) {
                errors.max_chars("email", email, 255);
            }
        }

        let password = password_field(&mut errors, &self.password);
        if let Some(password) = password {
            if errors.min_chars("password", password, 8) {
                let confirmation = self.password_confirmation.as_ref().and_then(Value::as_str);
                errors.confirmed("password", password, confirmation);
            }
        }

        let mut optional = |field: &str, value: &Option<Value>, max: usize| -> Option<String> {
            let value = errors.string(field, value)??.trim();
            if value.is_empty() {
                return None;
            }
            errors.max_chars(field, value, max).then(|| value.to_string())
        };
        let employee_id = optional("employee_id", &self.employee_id, 255);
        let department_code = optional("department_code", &self.department_code, 255);
        let government_id = optional("government_id", &self.government_id, 255);
        let phone = optional("phone", &self.phone, 20);

        let date_of_birth = match errors
            .string("date_of_birth", &self.date_of_birth)
            .flatten()
            .map(str::trim)
        {
            Some(raw) if !raw.is_empty() => errors.date("date_of_birth", raw),
            _ => None,
        };

        let is_admin = errors.boolean("is_admin", &self.is_admin).unwrap_or(false);

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) if errors.is_empty() => Ok(NewUser {
                name: name.to_string(),
                email: email.to_lowercase(),
                password: password.to_string(),
                is_admin,
                employee_id,
                department_code,
                government_id,
                phone,
                date_of_birth,
            }),
            _ => Err(errors),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<Value>,
    pub password: Option<Value>,
}

/// Login credentials after validation
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    type Output = Credentials;

    fn validate(self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = errors
            .string("email", &self.email)
            .and_then(|v| errors.required("email", v));
        if let Some(email) = email {
            errors.email("email", email);
        }

        let password = password_field(&mut errors, &self.password);

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok(Credentials {
                email: email.to_lowercase(),
                password: password.to_string(),
            }),
            _ => Err(errors),
        }
    }
}

/// Response for register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Validated bearer token attached to a request
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    pub token_id: i64,
    pub user: User,
}
