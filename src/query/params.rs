//! Query-string parameters of collection reads.

use super::{FilterValue, ListQuery, Projection};
use crate::error::AppError;

/// Reserved parameter names; everything else is treated as a field filter.
pub const SORT_BY_PARAM: &str = "sortBy";
pub const SORT_ORDER_PARAM: &str = "sortOrder";
pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "amount";
pub const FIELDS_PARAM: &str = "fields";

impl ListQuery {
    /// Build from decoded query pairs. A key given more than once becomes a
    /// membership filter.
    pub fn from_params(pairs: Vec<(String, String)>, default_page_size: u32) -> Result<Self, AppError> {
        let mut query = ListQuery {
            page_size: default_page_size,
            ..ListQuery::default()
        };
        for (key, value) in pairs {
            match key.as_str() {
                SORT_BY_PARAM => {
                    if !value.is_empty() {
                        query.sort_by = value;
                    }
                }
                SORT_ORDER_PARAM => {
                    if !value.is_empty() {
                        query.sort_order = value.parse()?;
                    }
                }
                PAGE_PARAM => query.page = parse_positive(PAGE_PARAM, &value)?,
                PAGE_SIZE_PARAM => query.page_size = parse_positive(PAGE_SIZE_PARAM, &value)?,
                FIELDS_PARAM => {
                    let fields: Vec<String> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                    if !fields.is_empty() {
                        query.projection = Projection(Some(fields));
                    }
                }
                _ => push_filter(&mut query.filters, key, value),
            }
        }
        Ok(query)
    }
}

fn push_filter(filters: &mut Vec<(String, FilterValue)>, key: String, value: String) {
    if let Some((_, existing)) = filters.iter_mut().find(|(k, _)| *k == key) {
        let merged = match std::mem::replace(existing, FilterValue::Many(Vec::new())) {
            FilterValue::One(first) => vec![first, value],
            FilterValue::Many(mut all) => {
                all.push(value);
                all
            }
        };
        *existing = FilterValue::Many(merged);
    } else {
        filters.push((key, FilterValue::One(value)));
    }
}

fn parse_positive(name: &str, value: &str) -> Result<u32, AppError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(AppError::Validation(format!("{} must be a positive integer", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortOrder;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply() {
        let q = ListQuery::from_params(Vec::new(), 25).unwrap();
        assert_eq!(q.sort_by, "id");
        assert_eq!(q.sort_order, SortOrder::Asc);
        assert_eq!((q.page, q.page_size), (1, 25));
    }

    #[test]
    fn repeated_keys_become_membership() {
        let q = ListQuery::from_params(pairs(&[("name", "Vesta"), ("name", "Ceres"), ("name", "Pallas")]), 25).unwrap();
        assert_eq!(
            q.filters,
            vec![(
                "name".to_string(),
                FilterValue::Many(vec!["Vesta".into(), "Ceres".into(), "Pallas".into()])
            )]
        );
    }

    #[test]
    fn reserved_params_are_parsed() {
        let q = ListQuery::from_params(
            pairs(&[("sortBy", "name"), ("sortOrder", "DESC"), ("page", "2"), ("amount", "5"), ("fields", "id, name")]),
            25,
        )
        .unwrap();
        assert_eq!(q.sort_by, "name");
        assert_eq!(q.sort_order, SortOrder::Desc);
        assert_eq!((q.page, q.page_size), (2, 5));
        assert_eq!(q.projection, Projection::only(["id", "name"]));
    }

    #[test]
    fn zero_page_is_rejected() {
        assert!(ListQuery::from_params(pairs(&[("page", "0")]), 25).is_err());
        assert!(ListQuery::from_params(pairs(&[("sortOrder", "sideways")]), 25).is_err());
    }
}
