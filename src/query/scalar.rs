//! Typed values coerced from JSON or query-string text by a declared field kind.

use crate::error::AppError;
use crate::resource::FieldKind;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl Scalar {
    /// Parse query-string text as `kind`.
    pub fn parse(kind: FieldKind, field: &str, raw: &str) -> Result<Scalar, AppError> {
        let invalid = || AppError::Validation(format!("{} must be a valid {}", field, kind_name(kind)));
        Ok(match kind {
            FieldKind::Int => Scalar::Int(raw.trim().parse().map_err(|_| invalid())?),
            FieldKind::Float => Scalar::Float(raw.trim().parse().map_err(|_| invalid())?),
            FieldKind::Text => Scalar::Text(raw.to_string()),
            FieldKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Scalar::Bool(true),
                "false" => Scalar::Bool(false),
                _ => return Err(invalid()),
            },
            FieldKind::Date => Scalar::Date(parse_date(raw.trim()).ok_or_else(invalid)?),
            FieldKind::DateTime => Scalar::DateTime(parse_datetime(raw.trim()).ok_or_else(invalid)?),
        })
    }

    /// Interpret a JSON value as `kind`. Dates and instants are accepted as strings.
    pub fn from_json(kind: FieldKind, field: &str, v: &Value) -> Result<Scalar, AppError> {
        let invalid = || AppError::Validation(format!("{} must be a valid {}", field, kind_name(kind)));
        if v.is_null() {
            return Ok(Scalar::Null);
        }
        Ok(match kind {
            FieldKind::Int => Scalar::Int(v.as_i64().ok_or_else(invalid)?),
            FieldKind::Float => Scalar::Float(v.as_f64().ok_or_else(invalid)?),
            FieldKind::Text => Scalar::Text(v.as_str().ok_or_else(invalid)?.to_string()),
            FieldKind::Bool => Scalar::Bool(v.as_bool().ok_or_else(invalid)?),
            FieldKind::Date => Scalar::Date(v.as_str().and_then(parse_date).ok_or_else(invalid)?),
            FieldKind::DateTime => Scalar::DateTime(v.as_str().and_then(parse_datetime).ok_or_else(invalid)?),
        })
    }

    /// Canonical JSON form, the shape records carry in and out of stores.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Int(n) => Value::from(*n),
            Scalar::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Scalar::DateTime(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::Micros, true)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Sort order matching PostgreSQL's default: nulls compare greater than any value.
    pub fn compare(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Ordering::Equal,
            (Scalar::Null, _) => Ordering::Greater,
            (_, Scalar::Null) => Ordering::Less,
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Scalar::Text(a), Scalar::Text(b)) => a.cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Date(a), Scalar::Date(b)) => a.cmp(b),
            (Scalar::DateTime(a), Scalar::DateTime(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_json() {
            Value::String(s) => f.write_str(&s),
            other => write!(f, "{}", other),
        }
    }
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Int => "integer",
        FieldKind::Float => "number",
        FieldKind::Text => "string",
        FieldKind::Bool => "boolean",
        FieldKind::Date => "date (YYYY-MM-DD)",
        FieldKind::DateTime => "RFC 3339 timestamp",
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
}
