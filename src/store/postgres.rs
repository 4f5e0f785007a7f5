//! PostgreSQL store: plans rendered by the SQL builder, executed through sqlx.

use super::{DeleteOutcome, RevokedToken, Store};
use crate::error::AppError;
use crate::query::{Predicate, Record, Scalar, SelectPlan};
use crate::resource::{ChildRef, FieldKind, TableDef, USERS};
use crate::sql::{self, quoted, PgBindValue, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, PgPool, Postgres, Row};
use std::str::FromStr;

/// Table holding revoked token digests.
pub const REVOKED_TOKENS_TABLE: &str = "revoked_tokens";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bound(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = p.clone().bind(query);
    }
    query
}

fn row_to_record(table: &TableDef, row: &PgRow) -> Result<Record, AppError> {
    let mut map = Record::new();
    for f in table.fields {
        let name = f.name;
        let value = match f.kind {
            FieldKind::Int => row.try_get::<Option<i64>, _>(name)?.map(Scalar::Int),
            FieldKind::Float => row.try_get::<Option<f64>, _>(name)?.map(Scalar::Float),
            FieldKind::Text => row.try_get::<Option<String>, _>(name)?.map(Scalar::Text),
            FieldKind::Bool => row.try_get::<Option<bool>, _>(name)?.map(Scalar::Bool),
            FieldKind::Date => row.try_get::<Option<NaiveDate>, _>(name)?.map(Scalar::Date),
            FieldKind::DateTime => row.try_get::<Option<DateTime<Utc>>, _>(name)?.map(Scalar::DateTime),
        };
        map.insert(name.to_string(), value.unwrap_or(Scalar::Null).to_json());
    }
    Ok(map)
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, table: &'static TableDef, record: Record) -> Result<Record, AppError> {
        let q = sql::insert(table, &record)?;
        let row = bound(&q).fetch_one(&self.pool).await?;
        row_to_record(table, &row)
    }

    async fn select(&self, plan: &SelectPlan) -> Result<Vec<Record>, AppError> {
        let q = sql::select_list(plan)?;
        let rows = bound(&q).fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_record(plan.table, r)).collect()
    }

    async fn select_by_id(&self, table: &'static TableDef, id: i64) -> Result<Option<Record>, AppError> {
        let mut q = sql::select_by_id(table);
        q.params.push(PgBindValue::I64(id));
        let row = bound(&q).fetch_optional(&self.pool).await?;
        row.map(|r| row_to_record(table, &r)).transpose()
    }

    async fn exists(&self, table: &'static TableDef, predicates: &[Predicate]) -> Result<bool, AppError> {
        let q = sql::exists(table, predicates)?;
        let row = bound(&q).fetch_one(&self.pool).await?;
        Ok(row.try_get::<bool, _>(0)?)
    }

    async fn update(&self, table: &'static TableDef, id: i64, changes: Record) -> Result<Option<Record>, AppError> {
        let q = sql::update(table, id, &changes)?;
        let row = bound(&q).fetch_optional(&self.pool).await?;
        row.map(|r| row_to_record(table, &r)).transpose()
    }

    async fn delete_unreferenced(
        &self,
        table: &'static TableDef,
        id: i64,
        children: &[ChildRef],
    ) -> Result<DeleteOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut lock = sql::lock_by_id(table);
        lock.params.push(PgBindValue::I64(id));
        if bound(&lock).fetch_optional(&mut *tx).await?.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        for child in children {
            let q = sql::exists(child.table, &[child.referencing(id)])?;
            let referenced: bool = bound(&q).fetch_one(&mut *tx).await?.try_get(0)?;
            if referenced {
                return Ok(DeleteOutcome::Referenced { child: child.table.label });
            }
        }

        let mut q = sql::delete(table);
        q.params.push(PgBindValue::I64(id));
        let row = bound(&q).fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        Ok(match row {
            Some(r) => DeleteOutcome::Deleted(row_to_record(table, &r)?),
            None => DeleteOutcome::NotFound,
        })
    }

    async fn record_failed_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<u32, AppError> {
        let sql = format!(
            "UPDATE {} SET \"login_attempts\" = COALESCE(\"login_attempts\", 0) + 1, \"last_login_attempt_at\" = $2 \
             WHERE \"id\" = $1 RETURNING \"login_attempts\"",
            quoted(USERS.name)
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))?;
        let attempts: i64 = row.try_get(0)?;
        Ok(attempts.max(0) as u32)
    }

    async fn reset_login_attempts(&self, user_id: i64) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE {} SET \"login_attempts\" = 0, \"last_login_attempt_at\" = NULL WHERE \"id\" = $1",
            quoted(USERS.name)
        );
        sqlx::query(&sql).bind(user_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn revoke_token(&self, entry: RevokedToken) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (\"token_hash\", \"expires_at\") VALUES ($1, $2) ON CONFLICT (\"token_hash\") DO NOTHING",
            quoted(REVOKED_TOKENS_TABLE)
        );
        sqlx::query(&sql)
            .bind(entry.token_hash)
            .bind(entry.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_token_revoked(&self, token_hash: &str) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE \"token_hash\" = $1)",
            quoted(REVOKED_TOKENS_TABLE)
        );
        let row = sqlx::query(&sql).bind(token_hash).fetch_one(&self.pool).await?;
        Ok(row.try_get::<bool, _>(0)?)
    }

    async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let sql = format!("DELETE FROM {} WHERE \"expires_at\" < $1", quoted(REVOKED_TOKENS_TABLE));
        let done = sqlx::query(&sql).bind(now).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::Validation(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::Validation("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
