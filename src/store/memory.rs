//! In-process store. One mutex serializes every operation, which gives the
//! same atomicity the PostgreSQL store gets from transactions and constraints.

use super::{DeleteOutcome, RevokedToken, Store};
use crate::error::AppError;
use crate::query::{Predicate, Record, Scalar, SelectPlan, SortOrder};
use crate::resource::{ChildRef, TableDef, USERS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<&'static str, BTreeMap<i64, Record>>,
    last_ids: HashMap<&'static str, i64>,
    revoked: HashMap<String, DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

fn column<'a>(record: &'a Record, name: &str) -> &'a Value {
    record.get(name).unwrap_or(&Value::Null)
}

fn cell(table: &TableDef, record: &Record, name: &str) -> Result<Scalar, AppError> {
    let f = table
        .field(name)
        .ok_or_else(|| AppError::Validation(format!("unknown field: {}", name)))?;
    Scalar::from_json(f.kind, f.name, column(record, name))
}

fn matches(table: &TableDef, record: &Record, predicates: &[Predicate]) -> Result<bool, AppError> {
    for p in predicates {
        let value = cell(table, record, p.field())?;
        if value.is_null() {
            return Ok(false);
        }
        let hit = match p {
            Predicate::Eq { value: wanted, .. } => value == *wanted,
            Predicate::In { values, .. } => values.contains(&value),
        };
        if !hit {
            return Ok(false);
        }
    }
    Ok(true)
}

impl MemoryState {
    fn rows(&self, table: &str) -> impl Iterator<Item = (&i64, &Record)> {
        self.tables.get(table).into_iter().flat_map(|rows| rows.iter())
    }

    fn check_unique(&self, table: &TableDef, record: &Record, except: Option<i64>) -> Result<(), AppError> {
        for col in table.unique {
            let value = cell(table, record, col)?;
            if value.is_null() {
                continue;
            }
            for (id, row) in self.rows(table.name) {
                if Some(*id) == except {
                    continue;
                }
                if cell(table, row, col)? == value {
                    return Err(AppError::Conflict(format!(
                        "A {} with {} {} already exists",
                        table.label, col, value
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_references(&self, table: &TableDef, record: &Record) -> Result<(), AppError> {
        for f in table.fields {
            let (Some(parent), Some(v)) = (f.references, record.get(f.name)) else {
                continue;
            };
            let Some(parent_id) = v.as_i64() else { continue };
            let found = self
                .tables
                .get(parent)
                .map(|rows| rows.contains_key(&parent_id))
                .unwrap_or(false);
            if !found {
                return Err(AppError::Conflict(format!(
                    "Referenced record {} = {} does not exist",
                    f.name, parent_id
                )));
            }
        }
        Ok(())
    }

    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.last_ids.entry(table).or_insert(0);
        *id += 1;
        *id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, table: &'static TableDef, mut record: Record) -> Result<Record, AppError> {
        let mut state = self.lock()?;
        record.remove("id");
        state.check_references(table, &record)?;
        state.check_unique(table, &record, None)?;
        let id = state.next_id(table.name);
        record.insert("id".into(), Value::from(id));
        for f in table.fields {
            record.entry(f.name).or_insert(Value::Null);
        }
        state.tables.entry(table.name).or_default().insert(id, record.clone());
        Ok(record)
    }

    async fn select(&self, plan: &SelectPlan) -> Result<Vec<Record>, AppError> {
        let state = self.lock()?;
        let table = plan.table;
        let mut hits = Vec::new();
        for (_, row) in state.rows(table.name) {
            if matches(table, row, &plan.predicates)? {
                hits.push((cell(table, row, plan.sort_by)?, row));
            }
        }
        hits.sort_by(|(a, ra), (b, rb)| {
            let primary = match plan.sort_order {
                SortOrder::Asc => a.compare(b),
                SortOrder::Desc => b.compare(a),
            };
            primary.then_with(|| {
                let ia = column(ra, "id").as_i64().unwrap_or_default();
                let ib = column(rb, "id").as_i64().unwrap_or_default();
                ia.cmp(&ib)
            })
        });
        Ok(hits
            .into_iter()
            .skip(plan.skip as usize)
            .take(plan.take as usize)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn select_by_id(&self, table: &'static TableDef, id: i64) -> Result<Option<Record>, AppError> {
        let state = self.lock()?;
        Ok(state.tables.get(table.name).and_then(|rows| rows.get(&id)).cloned())
    }

    async fn exists(&self, table: &'static TableDef, predicates: &[Predicate]) -> Result<bool, AppError> {
        let state = self.lock()?;
        for (_, row) in state.rows(table.name) {
            if matches(table, row, predicates)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn update(&self, table: &'static TableDef, id: i64, mut changes: Record) -> Result<Option<Record>, AppError> {
        let mut state = self.lock()?;
        let Some(current) = state.tables.get(table.name).and_then(|rows| rows.get(&id)).cloned() else {
            return Ok(None);
        };
        changes.remove("id");
        state.check_references(table, &changes)?;
        let mut merged = current;
        for (k, v) in changes {
            merged.insert(k, v);
        }
        state.check_unique(table, &merged, Some(id))?;
        state.tables.entry(table.name).or_default().insert(id, merged.clone());
        Ok(Some(merged))
    }

    async fn delete_unreferenced(
        &self,
        table: &'static TableDef,
        id: i64,
        children: &[ChildRef],
    ) -> Result<DeleteOutcome, AppError> {
        let mut state = self.lock()?;
        let present = state
            .tables
            .get(table.name)
            .map(|rows| rows.contains_key(&id))
            .unwrap_or(false);
        if !present {
            return Ok(DeleteOutcome::NotFound);
        }
        for child in children {
            let predicate = [child.referencing(id)];
            for (_, row) in state.rows(child.table.name) {
                if matches(child.table, row, &predicate)? {
                    return Ok(DeleteOutcome::Referenced { child: child.table.label });
                }
            }
        }
        let removed = state.tables.get_mut(table.name).and_then(|rows| rows.remove(&id));
        Ok(match removed {
            Some(row) => DeleteOutcome::Deleted(row),
            None => DeleteOutcome::NotFound,
        })
    }

    async fn record_failed_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<u32, AppError> {
        let mut state = self.lock()?;
        let row = state
            .tables
            .get_mut(USERS.name)
            .and_then(|rows| rows.get_mut(&user_id))
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))?;
        let attempts = column(row, "login_attempts").as_i64().unwrap_or(0) + 1;
        row.insert("login_attempts".into(), Value::from(attempts));
        row.insert("last_login_attempt_at".into(), Scalar::DateTime(at).to_json());
        Ok(attempts as u32)
    }

    async fn reset_login_attempts(&self, user_id: i64) -> Result<(), AppError> {
        let mut state = self.lock()?;
        let row = state
            .tables
            .get_mut(USERS.name)
            .and_then(|rows| rows.get_mut(&user_id))
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))?;
        row.insert("login_attempts".into(), Value::from(0));
        row.insert("last_login_attempt_at".into(), Value::Null);
        Ok(())
    }

    async fn revoke_token(&self, entry: RevokedToken) -> Result<(), AppError> {
        let mut state = self.lock()?;
        state.revoked.entry(entry.token_hash).or_insert(entry.expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, token_hash: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.revoked.contains_key(token_hash))
    }

    async fn purge_expired_revocations(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut state = self.lock()?;
        let before = state.revoked.len();
        state.revoked.retain(|_, expires_at| *expires_at >= now);
        Ok((before - state.revoked.len()) as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}
