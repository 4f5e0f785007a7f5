//! Convert typed scalars to values sqlx can bind.

use crate::query::Scalar;
use crate::resource::FieldKind;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value that can be bound to a PostgreSQL query. Nulls keep their column
/// kind so the parameter is sent with the right type.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null(FieldKind),
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl PgBindValue {
    pub fn from_scalar(kind: FieldKind, v: &Scalar) -> Self {
        match v {
            Scalar::Null => PgBindValue::Null(kind),
            Scalar::Bool(b) => PgBindValue::Bool(*b),
            Scalar::Int(n) => PgBindValue::I64(*n),
            Scalar::Float(f) => PgBindValue::F64(*f),
            Scalar::Text(s) => PgBindValue::String(s.clone()),
            Scalar::Date(d) => PgBindValue::Date(*d),
            Scalar::DateTime(t) => PgBindValue::Timestamp(*t),
        }
    }

    pub fn bind<'q>(self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            PgBindValue::Null(kind) => match kind {
                FieldKind::Int => query.bind(None::<i64>),
                FieldKind::Float => query.bind(None::<f64>),
                FieldKind::Text => query.bind(None::<String>),
                FieldKind::Bool => query.bind(None::<bool>),
                FieldKind::Date => query.bind(None::<NaiveDate>),
                FieldKind::DateTime => query.bind(None::<DateTime<Utc>>),
            },
            PgBindValue::Bool(b) => query.bind(b),
            PgBindValue::I64(n) => query.bind(n),
            PgBindValue::F64(f) => query.bind(f),
            PgBindValue::String(s) => query.bind(s),
            PgBindValue::Date(d) => query.bind(d),
            PgBindValue::Timestamp(t) => query.bind(t),
        }
    }
}
