//! Declarative list queries and their compilation into store plans.
//!
//! A `ListQuery` is what a caller asks for (raw filter text, sort, page,
//! projection). `ListQuery::compile` checks it against a `TableDef` and
//! produces a `SelectPlan` of typed predicates that any `Store` executes.

mod params;
mod scalar;

pub use params::*;
pub use scalar::Scalar;

use crate::error::AppError;
use crate::resource::TableDef;
use serde_json::{Map, Value};

/// A stored row: column name to canonical JSON value.
pub type Record = Map<String, Value>;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(AppError::Validation(format!(
                "invalid sortOrder: {} (expected asc or desc)",
                s
            ))),
        }
    }
}

/// Raw filter value as received; empty values are skipped at compile time.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

/// Fields to return. `None` means every non-sensitive field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection(pub Option<Vec<String>>);

impl Projection {
    pub fn all() -> Self {
        Projection(None)
    }

    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection(Some(fields.into_iter().map(Into::into).collect()))
    }

    /// Reject names the table does not expose.
    pub fn check(&self, table: &TableDef) -> Result<(), AppError> {
        if let Some(fields) = &self.0 {
            for name in fields {
                match table.field(name) {
                    Some(f) if !f.sensitive => {}
                    _ => {
                        return Err(AppError::Validation(format!(
                            "unknown field in projection: {}",
                            name
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Shape a full record for output. Sensitive fields never survive.
    pub fn apply(&self, table: &TableDef, mut record: Record) -> Record {
        for f in table.fields.iter().filter(|f| f.sensitive) {
            record.remove(f.name);
        }
        if let Some(fields) = &self.0 {
            record.retain(|k, _| fields.iter().any(|f| f == k));
        }
        record
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Eq { field: &'static str, value: Scalar },
    In { field: &'static str, values: Vec<Scalar> },
}

impl Predicate {
    pub fn field(&self) -> &'static str {
        match self {
            Predicate::Eq { field, .. } | Predicate::In { field, .. } => field,
        }
    }
}

/// A compiled, store-independent read.
#[derive(Clone, Debug)]
pub struct SelectPlan {
    pub table: &'static TableDef,
    pub predicates: Vec<Predicate>,
    pub sort_by: &'static str,
    pub sort_order: SortOrder,
    pub skip: u64,
    pub take: u64,
}

impl SelectPlan {
    /// Unpaged plan over `table` with the given predicates, ordered by id.
    pub fn filter(table: &'static TableDef, predicates: Vec<Predicate>) -> Self {
        SelectPlan {
            table,
            predicates,
            sort_by: "id",
            sort_order: SortOrder::Asc,
            skip: 0,
            take: MAX_PAGE_SIZE as u64,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ListQuery {
    pub filters: Vec<(String, FilterValue)>,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
    pub projection: Projection,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filters: Vec::new(),
            sort_by: "id".into(),
            sort_order: SortOrder::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            projection: Projection::all(),
        }
    }
}

impl ListQuery {
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), FilterValue::One(value.into())));
        self
    }

    pub fn filter_in<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push((field.into(), FilterValue::Many(values)));
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = field.into();
        self.sort_order = order;
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Compile against `table`. Filters on unknown or sensitive columns are
    /// ignored; a bad sort field, page or value is a validation error.
    pub fn compile(&self, table: &'static TableDef) -> Result<SelectPlan, AppError> {
        if self.page < 1 {
            return Err(AppError::Validation("page must be at least 1".into()));
        }
        if self.page_size < 1 {
            return Err(AppError::Validation("amount must be at least 1".into()));
        }
        let sort_field = table
            .field(&self.sort_by)
            .filter(|f| !f.sensitive)
            .ok_or_else(|| AppError::Validation(format!("cannot sort by {}", self.sort_by)))?;
        self.projection.check(table)?;

        let mut predicates = Vec::new();
        for (key, value) in &self.filters {
            let Some(field) = table.field(key).filter(|f| !f.sensitive) else {
                continue;
            };
            match value {
                FilterValue::One(raw) => {
                    if raw.is_empty() {
                        continue;
                    }
                    predicates.push(Predicate::Eq {
                        field: field.name,
                        value: Scalar::parse(field.kind, field.name, raw)?,
                    });
                }
                FilterValue::Many(raws) => {
                    let values = raws
                        .iter()
                        .filter(|r| !r.is_empty())
                        .map(|r| Scalar::parse(field.kind, field.name, r))
                        .collect::<Result<Vec<_>, _>>()?;
                    if values.is_empty() {
                        continue;
                    }
                    predicates.push(Predicate::In { field: field.name, values });
                }
            }
        }

        let page_size = self.page_size.min(MAX_PAGE_SIZE) as u64;
        Ok(SelectPlan {
            table,
            predicates,
            sort_by: sort_field.name,
            sort_order: self.sort_order,
            skip: (self.page as u64 - 1) * page_size,
            take: page_size,
        })
    }
}
