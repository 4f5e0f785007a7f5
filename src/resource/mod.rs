//! Static resource model: table descriptors with declared field kinds, and the
//! zero-sized types that name them for the generic data-access layer.

mod catalog;

pub use catalog::*;

use crate::query::{Predicate, Scalar};

/// Declared type of a column. Filter values and request bodies are coerced by
/// this declaration, never by inspecting the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Text,
    Bool,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// RFC 3339 instant, stored as UTC.
    DateTime,
}

impl FieldKind {
    /// PostgreSQL column type used in DDL and parameter casts.
    pub fn pg_type(self) -> &'static str {
        match self {
            FieldKind::Int => "bigint",
            FieldKind::Float => "double precision",
            FieldKind::Text => "text",
            FieldKind::Bool => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "timestamptz",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Accepted in create/update bodies.
    pub writable: bool,
    /// Never returned, filtered or sorted on.
    pub sensitive: bool,
    pub max_length: Option<usize>,
    /// Table name this column is a foreign key to.
    pub references: Option<&'static str>,
    /// SQL expression used as the column default in DDL.
    pub default_sql: Option<&'static str>,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef {
            name,
            kind,
            required: false,
            writable: true,
            sensitive: false,
            max_length: None,
            references: None,
            default_sql: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self.writable = false;
        self
    }

    pub const fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub const fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }

    pub const fn default_sql(mut self, expr: &'static str) -> Self {
        self.default_sql = Some(expr);
        self
    }
}

/// A child relation: rows of `table` point at the parent through `foreign_key`.
#[derive(Clone, Copy, Debug)]
pub struct ChildRef {
    pub table: &'static TableDef,
    pub foreign_key: &'static str,
}

impl ChildRef {
    /// Matches the child rows that point at parent `id`.
    pub fn referencing(&self, id: i64) -> Predicate {
        Predicate::Eq { field: self.foreign_key, value: Scalar::Int(id) }
    }
}

#[derive(Debug)]
pub struct TableDef {
    /// Table name in the store.
    pub name: &'static str,
    /// Singular, human-readable name used in messages.
    pub label: &'static str,
    /// Route segment, e.g. "stars".
    pub path: &'static str,
    pub fields: &'static [FieldDef],
    /// Columns that must be unique across the table (each on its own).
    pub unique: &'static [&'static str],
    /// Relations checked before a row of this table is deleted.
    pub children: &'static [ChildRef],
    /// Foreign-key column that at most one row may hold a given value of.
    pub sole_owner: Option<&'static str>,
}

impl TableDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_unique(&self, column: &str) -> bool {
        self.unique.iter().any(|c| *c == column)
    }
}

/// A resource type known at compile time. Implemented by zero-sized markers so
/// `Repository<Star>` and `Repository<Planet>` are distinct types.
pub trait Resource: Send + Sync + 'static {
    fn table() -> &'static TableDef;
}
