//! HTTP handlers: auth, users and the generic catalog resources.

pub mod auth;
pub mod resource;
pub mod users;

use crate::error::AppError;
use crate::query::{ListQuery, Projection};

pub(crate) fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid id: {}", id_str)))
}

/// Projection from a `fields` parameter; other parameters are ignored.
pub(crate) fn projection(params: Vec<(String, String)>) -> Result<Projection, AppError> {
    Ok(ListQuery::from_params(params, 1)?.projection)
}

/// "meteor shower" -> "Meteor shower"
pub(crate) fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_integers() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(AppError::Validation(_))));
    }

    #[test]
    fn labels_are_capitalized() {
        assert_eq!(capitalized("meteor shower"), "Meteor shower");
        assert_eq!(capitalized(""), "");
    }
}
