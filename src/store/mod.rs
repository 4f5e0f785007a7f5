//! Storage seam. The core compiles queries into `SelectPlan`s and calls a
//! `Store`; `PgStore` renders them to SQL, `MemoryStore` evaluates them in
//! process. Every method is a single atomic unit on the backing store.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore, REVOKED_TOKENS_TABLE};

use crate::error::AppError;
use crate::query::{Predicate, Record, SelectPlan};
use crate::resource::{ChildRef, TableDef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of a guarded delete.
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted(Record),
    NotFound,
    /// At least one child row still points at the record; nothing was deleted.
    Referenced { child: &'static str },
}

/// A revoked access token, keyed by digest, remembered until it would have expired.
#[derive(Clone, Debug, PartialEq)]
pub struct RevokedToken {
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert and return the stored row. Unique and foreign-key violations are `Conflict`.
    async fn insert(&self, table: &'static TableDef, record: Record) -> Result<Record, AppError>;

    async fn select(&self, plan: &SelectPlan) -> Result<Vec<Record>, AppError>;

    async fn select_by_id(&self, table: &'static TableDef, id: i64) -> Result<Option<Record>, AppError>;

    async fn exists(&self, table: &'static TableDef, predicates: &[Predicate]) -> Result<bool, AppError>;

    /// Set the given columns; `None` if no row has `id`.
    async fn update(&self, table: &'static TableDef, id: i64, changes: Record) -> Result<Option<Record>, AppError>;

    /// Delete `id` unless a row in one of `children` references it. Check and
    /// delete happen atomically.
    async fn delete_unreferenced(
        &self,
        table: &'static TableDef,
        id: i64,
        children: &[ChildRef],
    ) -> Result<DeleteOutcome, AppError>;

    /// Atomically add one failed attempt and stamp it; returns the new count.
    async fn record_failed_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<u32, AppError>;

    async fn reset_login_attempts(&self, user_id: i64) -> Result<(), AppError>;

    /// Idempotent.
    async fn revoke_token(&self, entry: RevokedToken) -> Result<(), AppError>;

    async fn is_token_revoked(&self, token_hash: &str) -> Result<bool, AppError>;

    /// Forget revocations whose token expired before `now`; returns how many.
    async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), AppError>;
}
