//! Referential checks run before destructive or one-to-one writes.

use crate::error::AppError;
use crate::query::{Predicate, Record, Scalar, SelectPlan};
use crate::resource::{ChildRef, TableDef};
use crate::store::Store;

pub struct IntegrityGuard<'a> {
    store: &'a dyn Store,
}

impl<'a> IntegrityGuard<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        IntegrityGuard { store }
    }

    /// True if any row of any child table references `id`.
    ///
    /// Read-only and not atomic with any later write. Deletes go through
    /// `Store::delete_unreferenced`, which runs the same check under the
    /// store's lock or transaction.
    pub async fn has_children(&self, children: &[ChildRef], id: i64) -> Result<bool, AppError> {
        for child in children {
            if self.store.exists(child.table, &[child.referencing(id)]).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The row of `table` holding `value` in `key`, if any.
    pub async fn find_sole_owner(
        &self,
        table: &'static TableDef,
        key: &'static str,
        value: &Scalar,
    ) -> Result<Option<Record>, AppError> {
        let mut plan = SelectPlan::filter(table, vec![Predicate::Eq { field: key, value: value.clone() }]);
        plan.take = 1;
        Ok(self.store.select(&plan).await?.into_iter().next())
    }

    /// Enforce the table's one-to-one column for a row about to be written.
    /// `updating` names the row being updated, which may keep its own value.
    pub async fn check_sole_owner(
        &self,
        table: &'static TableDef,
        record: &Record,
        updating: Option<i64>,
    ) -> Result<(), AppError> {
        let Some(key) = table.sole_owner else {
            return Ok(());
        };
        let (Some(f), Some(raw)) = (table.field(key), record.get(key)) else {
            return Ok(());
        };
        let value = Scalar::from_json(f.kind, f.name, raw)?;
        if value.is_null() {
            return Ok(());
        }
        if let Some(owner) = self.find_sole_owner(table, key, &value).await? {
            let owner_id = owner.get("id").and_then(|v| v.as_i64());
            if updating.is_none() || owner_id != updating {
                return Err(AppError::Conflict(format!(
                    "A {} with {} {} already exists",
                    table.label, key, value
                )));
            }
        }
        Ok(())
    }
}
