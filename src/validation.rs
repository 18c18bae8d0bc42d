use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;

const PASSWORD_MIN_LEN: usize = 6;
const PASSWORD_MAX_LEN: usize = 16;
const PASSWORD_SYMBOLS: &str = "@$!%*?&";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub value: Value,
    pub message: String,
}

/// Collects field errors so a single response can report all of them.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&mut self, field: &str, value: Value, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            value,
            message: message.to_string(),
        });
    }

    /// Returns the trimmed value, or records `message` if it is missing or blank.
    pub fn required(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            other => {
                self.reject(field, other.map_or(Value::Null, |v| Value::from(v)), message);
                None
            }
        }
    }

    pub fn parse<T: FromStr>(&mut self, field: &str, value: &str, message: &str) -> Option<T> {
        match value.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.reject(field, Value::from(value), message);
                None
            }
        }
    }

    /// Password values are never echoed back in the error.
    pub fn password(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.reject(field, Value::Null, "password is not empty");
                return None;
            }
        };

        let len = value.chars().count();
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
            self.reject(field, Value::Null, "password must be between 6 and 16 characters");
            return None;
        }

        let allowed = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c));
        let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        if !(allowed && has_letter && has_digit) {
            self.reject(field, Value::Null, "password must contain at least one letter and one digit");
            return None;
        }

        Some(value.to_string())
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}
