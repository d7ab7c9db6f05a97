/// Request validation
///
/// Collects per-field error messages the way the original framework reports
/// them, so that clients get a single 422 listing every failing field.
use crate::error::FmsError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use validator::ValidateEmail;

/// Ordered bag of field -> messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message for a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field.to_string(), vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    /// Total number of messages across all fields
    pub fn count(&self) -> usize {
        self.entries.iter().map(|(_, messages)| messages.len()).sum()
    }

    /// First message, with a count of the remaining ones
    ///
    /// "The name field is required. (and 2 more errors)"
    pub fn summary(&self) -> String {
        let first = self
            .entries
            .first()
            .and_then(|(_, messages)| messages.first())
            .cloned()
            .unwrap_or_else(|| "The given data was invalid.".to_string());

        match self.count().saturating_sub(1) {
            0 => first,
            1 => format!("{} (and 1 more error)", first),
            n => format!("{} (and {} more errors)", first, n),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.entries.iter().cloned().collect()
    }

    // ----- rules -----

    /// JSON value must be a string when present
    ///
    /// `None` means a type error was recorded; `Some(None)` means absent or null.
    pub fn string<'v>(
        &mut self,
        field: &str,
        value: &'v Option<Value>,
    ) -> Option<Option<&'v str>> {
        match value {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => Some(Some(s.as_str())),
            Some(_) => {
                self.add(field, format!("The {} field must be a string.", label(field)));
                None
            }
        }
    }

    /// Accepts `true`, `false`, `1`, `0`, `"1"` and `"0"`
    pub fn boolean(&mut self, field: &str, value: &Option<Value>) -> Option<bool> {
        let parsed = match value {
            None | Some(Value::Null) => return None,
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Some(Value::String(s)) => match s.as_str() {
                "1" => Some(true),
                "0" => Some(false),
                _ => None,
            },
            Some(_) => None,
        };

        if parsed.is_none() {
            self.add(
                field,
                format!("The {} field must be true or false.", label(field)),
            );
        }
        parsed
    }

    /// Value must be present and not blank. Returns the trimmed value.
    pub fn required<'v>(&mut self, field: &str, value: Option<&'v str>) -> Option<&'v str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.add(field, format!("The {} field is required.", label(field)));
                None
            }
        }
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) -> bool {
        if value.chars().count() > max {
            self.add(
                field,
                format!(
                    "The {} field must not be greater than {} characters.",
                    label(field),
                    max
                ),
            );
            return false;
        }
        true
    }

    pub fn min_chars(&mut self, field: &str, value: &str, min: usize) -> bool {
        if value.chars().count() < min {
            self.add(
                field,
                format!("The {} field must be at least {} characters.", label(field), min),
            );
            return false;
        }
        true
    }

    pub fn email(&mut self, field: &str, value: &str) -> bool {
        if !value.validate_email() {
            self.add(
                field,
                format!("The {} field must be a valid email address.", label(field)),
            );
            return false;
        }
        true
    }

    pub fn numeric(&mut self, field: &str, value: &str) -> Option<f64> {
        match value.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Some(n),
            _ => {
                self.add(field, format!("The {} field must be a number.", label(field)));
                None
            }
        }
    }

    pub fn between(&mut self, field: &str, value: f64, min: f64, max: f64) -> bool {
        if value < min || value > max {
            self.add(
                field,
                format!("The {} field must be between {} and {}.", label(field), min, max),
            );
            return false;
        }
        true
    }

    /// Value must parse into one of an enumeration
    pub fn one_of<T: FromStr>(&mut self, field: &str, value: &str) -> Option<T> {
        match value.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.add(field, format!("The selected {} is invalid.", label(field)));
                None
            }
        }
    }

    pub fn date(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
        match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                self.add(field, format!("The {} field must be a valid date.", label(field)));
                None
            }
        }
    }

    /// `<field>_confirmation` must match `<field>`
    pub fn confirmed(&mut self, field: &str, value: &str, confirmation: Option<&str>) -> bool {
        if confirmation != Some(value) {
            self.add(
                field,
                format!("The {} field confirmation does not match.", label(field)),
            );
            return false;
        }
        true
    }
}

/// Human-readable field name ("issue_type" -> "issue type")
fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Raw request bodies that check themselves and produce a typed value
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, FieldErrors>;
}

/// JSON extractor that deserializes `T` then runs [`Validate`]
///
/// Handlers receive the validated output, never the raw body.
pub struct ValidJson<T: Validate>(pub T::Output);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = FmsError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        let output = raw.validate().map_err(FmsError::Validation)?;

        Ok(ValidJson(output))
    }
}

fn json_rejection(rejection: JsonRejection) -> FmsError {
    tracing::debug!(error = %rejection, "json_body_rejected");
    match rejection.status() {
        StatusCode::UNPROCESSABLE_ENTITY => FmsError::field("body", rejection.body_text()),
        StatusCode::PAYLOAD_TOO_LARGE => FmsError::PayloadTooLarge(rejection.body_text()),
        _ => FmsError::BadRequest(rejection.body_text()),
    }
}

/// Serde helper separating "absent" from "explicit null"
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent -> `None`, `null` -> `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
