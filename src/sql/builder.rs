//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from table descriptors
//! and compiled plans.

use super::PgBindValue;
use crate::error::AppError;
use crate::query::{Predicate, Record, Scalar, SelectPlan, SortOrder};
use crate::resource::{FieldDef, TableDef};

/// Quote identifier for PostgreSQL (safe: only from the static catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    /// Push a parameter and return its placeholder with the column cast.
    fn push_param(&mut self, field: &FieldDef, v: &Scalar) -> String {
        self.params.push(PgBindValue::from_scalar(field.kind, v));
        format!("${}::{}", self.params.len(), field.kind.pg_type())
    }
}

/// SELECT list: every column, sensitive ones included (callers project later).
fn select_column_list(table: &TableDef) -> String {
    table
        .fields
        .iter()
        .map(|f| quoted(f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn field<'a>(table: &'a TableDef, name: &str) -> Result<&'a FieldDef, AppError> {
    table
        .fields
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| AppError::Validation(format!("unknown field: {}", name)))
}

fn where_clause(q: &mut QueryBuf, table: &TableDef, predicates: &[Predicate]) -> Result<String, AppError> {
    let mut parts = Vec::with_capacity(predicates.len());
    for p in predicates {
        let f = field(table, p.field())?;
        match p {
            Predicate::Eq { value, .. } => {
                let ph = q.push_param(f, value);
                parts.push(format!("{} = {}", quoted(f.name), ph));
            }
            Predicate::In { values, .. } => {
                if values.is_empty() {
                    parts.push("1 = 0".to_string());
                    continue;
                }
                let phs: Vec<String> = values.iter().map(|v| q.push_param(f, v)).collect();
                parts.push(format!("{} IN ({})", quoted(f.name), phs.join(", ")));
            }
        }
    }
    Ok(if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    })
}

/// SELECT by primary key. Caller binds the id as $1.
pub fn select_by_id(table: &TableDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} WHERE \"id\" = $1",
        select_column_list(table),
        quoted(table.name)
    );
    q
}

/// SELECT one page: typed predicates ANDed, ORDER BY the sort field with id as
/// tiebreaker, LIMIT/OFFSET from the plan.
pub fn select_list(plan: &SelectPlan) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let table = plan.table;
    let sort = field(table, plan.sort_by)?;
    let where_sql = where_clause(&mut q, table, &plan.predicates)?;
    let dir = match plan.sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let mut order = format!(" ORDER BY {} {}", quoted(sort.name), dir);
    if sort.name != "id" {
        order.push_str(", \"id\" ASC");
    }
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        select_column_list(table),
        quoted(table.name),
        where_sql,
        order,
        plan.take,
        plan.skip
    );
    Ok(q)
}

/// SELECT EXISTS(...) over the predicates.
pub fn exists(table: &TableDef, predicates: &[Predicate]) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, table, predicates)?;
    q.sql = format!("SELECT EXISTS(SELECT 1 FROM {}{})", quoted(table.name), where_sql);
    Ok(q)
}

/// INSERT the columns present in the record; absent columns take the DB default.
pub fn insert(table: &TableDef, record: &Record) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in table.fields.iter().filter(|f| f.name != "id") {
        let Some(v) = record.get(f.name) else { continue };
        let value = Scalar::from_json(f.kind, f.name, v)?;
        placeholders.push(q.push_param(f, &value));
        cols.push(quoted(f.name));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(table.name),
            select_column_list(table)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(table.name),
            cols.join(", "),
            placeholders.join(", "),
            select_column_list(table)
        )
    };
    Ok(q)
}

/// UPDATE by id: SET only columns present in the record. With nothing to set
/// this degrades to a SELECT so callers still get the row (or none).
pub fn update(table: &TableDef, id: i64, record: &Record) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in table.fields.iter().filter(|f| f.name != "id") {
        let Some(v) = record.get(f.name) else { continue };
        let value = Scalar::from_json(f.kind, f.name, v)?;
        let ph = q.push_param(f, &value);
        sets.push(format!("{} = {}", quoted(f.name), ph));
    }
    if sets.is_empty() {
        let mut q = select_by_id(table);
        q.params.push(PgBindValue::I64(id));
        return Ok(q);
    }
    q.params.push(PgBindValue::I64(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING {}",
        quoted(table.name),
        sets.join(", "),
        q.params.len(),
        select_column_list(table)
    );
    Ok(q)
}

/// Lock one row for the rest of the transaction. Caller binds the id as $1.
pub fn lock_by_id(table: &TableDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT \"id\" FROM {} WHERE \"id\" = $1 FOR UPDATE", quoted(table.name));
    q
}

/// DELETE by id. Caller binds the id as $1.
pub fn delete(table: &TableDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "DELETE FROM {} WHERE \"id\" = $1 RETURNING {}",
        quoted(table.name),
        select_column_list(table)
    );
    q
}
