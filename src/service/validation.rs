//! Request-body validation against the declared table fields.

use crate::error::AppError;
use crate::query::{Record, Scalar};
use crate::resource::{FieldDef, TableDef};
use regex::Regex;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body. Every required field must be present and non-null.
    pub fn for_create(table: &TableDef, body: &Value) -> Result<Record, AppError> {
        let record = Self::coerce(table, body)?;
        for f in table.fields.iter().filter(|f| f.required && f.writable) {
            if record.get(f.name).map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", f.name)));
            }
        }
        Ok(record)
    }

    /// Validate only the fields present in body (for PATCH).
    pub fn for_update(table: &TableDef, body: &Value) -> Result<Record, AppError> {
        Self::coerce(table, body)
    }

    fn coerce(table: &TableDef, body: &Value) -> Result<Record, AppError> {
        let map = body_to_map(body)?;
        let mut record = Record::new();
        for (key, v) in map {
            let f = table
                .field(key)
                .ok_or_else(|| AppError::Validation(format!("unknown field: {}", key)))?;
            if !f.writable {
                return Err(AppError::Validation(format!("{} cannot be set", key)));
            }
            let value = Scalar::from_json(f.kind, f.name, v)?;
            validate_field(f, &value)?;
            record.insert(f.name.to_string(), value.to_json());
        }
        Ok(record)
    }
}

pub fn body_to_map(body: &Value) -> Result<&serde_json::Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| AppError::Validation("body must be a JSON object".into()))
}

fn validate_field(f: &FieldDef, value: &Scalar) -> Result<(), AppError> {
    if value.is_null() {
        if f.required {
            return Err(AppError::Validation(format!("{} is required", f.name)));
        }
        return Ok(());
    }
    if let Scalar::Text(s) = value {
        if f.required && s.trim().is_empty() {
            return Err(AppError::Validation(format!("{} must not be empty", f.name)));
        }
        if let Some(max) = f.max_length {
            if s.chars().count() > max {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    f.name, max
                )));
            }
        }
        if f.name == "email_address" && !email_pattern()?.is_match(s) {
            return Err(AppError::Validation(format!("{} must be a valid email", f.name)));
        }
    }
    Ok(())
}

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

fn email_pattern() -> Result<Regex, AppError> {
    Regex::new(EMAIL_PATTERN).map_err(|e| AppError::Internal(format!("email pattern: {}", e)))
}
