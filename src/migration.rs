//! Apply the catalog to the database: tables, foreign-key indexes and the
//! revoked-token table. Tables are created parents first so every REFERENCES
//! clause points at a table that already exists.

use crate::config::validate_catalog;
use crate::error::AppError;
use crate::resource::TableDef;
use crate::sql::quoted;
use crate::store::REVOKED_TOKENS_TABLE;
use sqlx::PgPool;

/// Validate `tables` and create whatever is missing. Idempotent.
pub async fn apply_migrations(pool: &PgPool, tables: &[&'static TableDef]) -> Result<(), AppError> {
    validate_catalog(tables)?;

    for table in tables {
        let sql = create_table_sql(table);
        tracing::debug!(table = table.name, "create table");
        sqlx::query(&sql).execute(pool).await?;
        for sql in foreign_key_index_sql(table) {
            sqlx::query(&sql).execute(pool).await?;
        }
    }

    sqlx::query(&revoked_tokens_sql()).execute(pool).await?;
    tracing::info!(tables = tables.len(), "schema up to date");
    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` for one catalog table.
pub fn create_table_sql(table: &TableDef) -> String {
    let mut col_defs: Vec<String> = Vec::new();
    for f in table.fields {
        if f.name == "id" {
            col_defs.push(format!("{} BIGSERIAL PRIMARY KEY", quoted("id")));
            continue;
        }
        let mut def = format!("{} {}", quoted(f.name), f.kind.pg_type().to_uppercase());
        if f.required {
            def.push_str(" NOT NULL");
        }
        if let Some(d) = f.default_sql {
            def.push_str(" DEFAULT ");
            def.push_str(d);
        }
        if let Some(parent) = f.references {
            def.push_str(&format!(" REFERENCES {} ({}) ON DELETE RESTRICT", quoted(parent), quoted("id")));
        }
        col_defs.push(def);
    }
    for u in table.unique {
        col_defs.push(format!("UNIQUE ({})", quoted(u)));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(table.name),
        col_defs.join(",\n  ")
    )
}

/// One index per foreign-key column that isn't already covered by a UNIQUE constraint.
pub fn foreign_key_index_sql(table: &TableDef) -> Vec<String> {
    table
        .fields
        .iter()
        .filter(|f| f.references.is_some() && !table.is_unique(f.name))
        .map(|f| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("{}_{}_idx", table.name, f.name)),
                quoted(table.name),
                quoted(f.name)
            )
        })
        .collect()
}

fn revoked_tokens_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  \"token_hash\" TEXT PRIMARY KEY,\n  \"expires_at\" TIMESTAMPTZ NOT NULL,\n  \"revoked_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW()\n)",
        quoted(REVOKED_TOKENS_TABLE)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{METEOR_SHOWERS, STARS, USERS};

    #[test]
    fn users_table_carries_defaults_and_unique_email() {
        let sql = create_table_sql(&USERS);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"users\""));
        assert!(sql.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(sql.contains("\"email_address\" TEXT NOT NULL"));
        assert!(sql.contains("\"enabled\" BOOLEAN DEFAULT TRUE"));
        assert!(sql.contains("\"login_attempts\" BIGINT DEFAULT 0"));
        assert!(sql.contains("\"created_at\" TIMESTAMPTZ DEFAULT NOW()"));
        assert!(sql.contains("UNIQUE (\"email_address\")"));
    }

    #[test]
    fn foreign_keys_restrict_delete() {
        let sql = create_table_sql(&STARS);
        assert!(sql.contains(
            "\"galaxy_id\" BIGINT NOT NULL REFERENCES \"galaxies\" (\"id\") ON DELETE RESTRICT"
        ));
        assert!(sql.contains("\"constellation_id\" BIGINT REFERENCES \"constellations\""));
    }

    #[test]
    fn unique_foreign_keys_get_no_extra_index() {
        assert_eq!(foreign_key_index_sql(&STARS).len(), 2);
        assert!(foreign_key_index_sql(&METEOR_SHOWERS).is_empty());
        assert!(create_table_sql(&METEOR_SHOWERS).contains("UNIQUE (\"constellation_id\")"));
    }
}
