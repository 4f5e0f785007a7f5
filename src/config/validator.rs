//! Catalog validation: primary keys, declared columns and relation consistency.

use crate::error::ConfigError;
use crate::resource::{FieldKind, TableDef};
use std::collections::HashSet;

/// Check that `tables` (parents first) describe a consistent schema.
pub fn validate_catalog(tables: &[&TableDef]) -> Result<(), ConfigError> {
    let mut seen: HashSet<&str> = HashSet::new();

    for t in tables {
        if !seen.insert(t.name) {
            return Err(ConfigError::Validation(format!("table {} declared twice", t.name)));
        }
        match t.field("id") {
            Some(f) if f.kind == FieldKind::Int && !f.writable => {}
            _ => return Err(ConfigError::InvalidPrimaryKey { table: t.name.to_string() }),
        }

        let mut columns: HashSet<&str> = HashSet::new();
        for f in t.fields {
            if !columns.insert(f.name) {
                return Err(ConfigError::Validation(format!(
                    "table {} declares column {} twice",
                    t.name, f.name
                )));
            }
            if let Some(parent) = f.references {
                if !seen.contains(parent) || parent == t.name {
                    return Err(ConfigError::MissingReference {
                        kind: "table",
                        id: format!("{} (from {}.{})", parent, t.name, f.name),
                    });
                }
                if f.kind != FieldKind::Int {
                    return Err(ConfigError::Validation(format!(
                        "foreign key {}.{} must be an integer",
                        t.name, f.name
                    )));
                }
            }
        }

        for col in t.unique {
            if t.field(col).is_none() {
                return Err(unknown(t.name, col));
            }
        }

        if let Some(col) = t.sole_owner {
            let f = t.field(col).ok_or_else(|| unknown(t.name, col))?;
            if f.references.is_none() || !t.is_unique(col) {
                return Err(ConfigError::Validation(format!(
                    "sole owner column {}.{} must be a unique foreign key",
                    t.name, col
                )));
            }
        }

        for child in t.children {
            let fk = child
                .table
                .field(child.foreign_key)
                .ok_or_else(|| unknown(child.table.name, child.foreign_key))?;
            if fk.references != Some(t.name) {
                return Err(ConfigError::Validation(format!(
                    "child relation {}.{} does not reference {}",
                    child.table.name, child.foreign_key, t.name
                )));
            }
        }
    }

    // Every foreign key must be guarded on delete.
    for t in tables {
        for f in t.fields {
            let Some(parent) = f.references else { continue };
            let guarded = tables
                .iter()
                .filter(|p| p.name == parent)
                .flat_map(|p| p.children.iter())
                .any(|c| c.table.name == t.name && c.foreign_key == f.name);
            if !guarded {
                return Err(ConfigError::Validation(format!(
                    "{} has no child relation for {}.{}",
                    parent, t.name, f.name
                )));
            }
        }
    }

    Ok(())
}

fn unknown(table: &str, column: &str) -> ConfigError {
    ConfigError::UnknownField { table: table.to_string(), column: column.to_string() }
}
