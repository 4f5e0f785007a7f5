//! Generic CRUD over one resource type.

use super::guard::IntegrityGuard;
use super::validation::RequestValidator;
use crate::error::AppError;
use crate::query::{ListQuery, Predicate, Projection, Record, Scalar, SelectPlan};
use crate::resource::{Resource, TableDef};
use crate::store::{DeleteOutcome, Store};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Repository<R: Resource> {
    store: Arc<dyn Store>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Repository { store: self.store.clone(), _resource: PhantomData }
    }
}

fn not_found(table: &TableDef, id: i64) -> AppError {
    AppError::NotFound(format!("No {} found with id {}", table.label, id))
}

impl<R: Resource> Repository<R> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Repository { store, _resource: PhantomData }
    }

    pub fn table(&self) -> &'static TableDef {
        R::table()
    }

    pub fn guard(&self) -> IntegrityGuard<'_> {
        IntegrityGuard::new(self.store.as_ref())
    }

    /// Validate a request body and insert it.
    pub async fn create(&self, body: &Value, projection: &Projection) -> Result<Record, AppError> {
        projection.check(R::table())?;
        let record = RequestValidator::for_create(R::table(), body)?;
        let created = self.insert(record).await?;
        Ok(projection.apply(R::table(), created))
    }

    /// Insert an already validated record; returns the stored row, sensitive fields included.
    pub async fn insert(&self, record: Record) -> Result<Record, AppError> {
        let table = R::table();
        self.guard().check_sole_owner(table, &record, None).await?;
        let created = self.store.insert(table, record).await?;
        tracing::info!(table = table.name, id = ?created.get("id"), "created");
        Ok(created)
    }

    /// One page of rows, shaped by the query's projection.
    pub async fn find_all(&self, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        self.find_all_with(query, Vec::new()).await
    }

    /// `find_all` with extra predicates the caller cannot override.
    pub async fn find_all_with(&self, query: &ListQuery, extra: Vec<Predicate>) -> Result<Vec<Record>, AppError> {
        let table = R::table();
        let mut plan = query.compile(table)?;
        plan.predicates.extend(extra);
        let rows = self.store.select(&plan).await?;
        Ok(rows
            .into_iter()
            .map(|row| query.projection.apply(table, row))
            .collect())
    }

    pub async fn find_by_id(&self, id: i64, projection: &Projection) -> Result<Record, AppError> {
        projection.check(R::table())?;
        let row = self.fetch(id).await?.ok_or_else(|| not_found(R::table(), id))?;
        Ok(projection.apply(R::table(), row))
    }

    /// The full stored row, sensitive fields included. Not for output.
    pub async fn fetch(&self, id: i64) -> Result<Option<Record>, AppError> {
        self.store.select_by_id(R::table(), id).await
    }

    /// The full stored row whose `field` equals `value`.
    pub async fn fetch_by(&self, field: &'static str, value: Scalar) -> Result<Option<Record>, AppError> {
        let mut plan = SelectPlan::filter(R::table(), vec![Predicate::Eq { field, value }]);
        plan.take = 1;
        Ok(self.store.select(&plan).await?.into_iter().next())
    }

    /// Validate a partial body and apply it.
    pub async fn update(&self, id: i64, body: &Value, projection: &Projection) -> Result<Record, AppError> {
        projection.check(R::table())?;
        let changes = RequestValidator::for_update(R::table(), body)?;
        let updated = self.apply(id, changes).await?;
        Ok(projection.apply(R::table(), updated))
    }

    /// Apply validated changes; returns the stored row, sensitive fields included.
    pub async fn apply(&self, id: i64, changes: Record) -> Result<Record, AppError> {
        let table = R::table();
        self.guard().check_sole_owner(table, &changes, Some(id)).await?;
        let updated = self
            .store
            .update(table, id, changes)
            .await?
            .ok_or_else(|| not_found(table, id))?;
        tracing::info!(table = table.name, id, "updated");
        Ok(updated)
    }

    /// Delete unless a child row still references the record; returns the
    /// removed row shaped by `projection`.
    pub async fn delete(&self, id: i64, projection: &Projection) -> Result<Record, AppError> {
        let table = R::table();
        projection.check(table)?;
        match self.store.delete_unreferenced(table, id, table.children).await? {
            DeleteOutcome::Deleted(row) => {
                tracing::info!(table = table.name, id, "deleted");
                Ok(projection.apply(table, row))
            }
            DeleteOutcome::NotFound => Err(not_found(table, id)),
            DeleteOutcome::Referenced { child } => {
                tracing::warn!(table = table.name, id, child, "delete blocked by child rows");
                Err(AppError::Conflict(format!(
                    "Cannot delete {} {}: it has child objects ({})",
                    table.label, id, child
                )))
            }
        }
    }
}
