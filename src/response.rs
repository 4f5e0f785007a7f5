//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub count: u64,
    pub data: Vec<T>,
}

/// Mutation envelope: a human-readable message plus the affected record, if any.
#[derive(Serialize)]
pub struct Mutation<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (StatusCode::OK, Json(SuccessMany { count, data }))
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> (StatusCode, Json<Mutation<T>>) {
    (
        StatusCode::CREATED,
        Json(Mutation {
            message: message.into(),
            data: Some(data),
        }),
    )
}

pub fn mutated<T: Serialize>(message: impl Into<String>, data: Option<T>) -> (StatusCode, Json<Mutation<T>>) {
    (
        StatusCode::OK,
        Json(Mutation {
            message: message.into(),
            data,
        }),
    )
}
