//! Users resource handlers.

use super::{parse_id, projection};
use crate::error::AppError;
use crate::extractors::{AuthUser, JsonBody, QueryPairs, QueryParams};
use crate::query::ListQuery;
use crate::response::{created, mutated, success_many, success_one};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    QueryParams(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let query = ListQuery::from_params(params, state.settings.default_page_size)?;
    let rows = state.users.list(&user.context, &query).await?;
    Ok(success_many(rows))
}

pub async fn read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id_str): Path<String>,
    QueryParams(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = state.users.read(&user.context, id, &projection(params)?).await?;
    Ok(success_one(row))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    QueryParams(params): QueryPairs,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let row = state.users.create(&user.context, &body, &projection(params)?).await?;
    Ok(created("User created", row))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id_str): Path<String>,
    QueryParams(params): QueryPairs,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = state.users.update(&user.context, id, &body, &projection(params)?).await?;
    Ok(mutated("User updated", Some(row)))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id_str): Path<String>,
    QueryParams(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = state.users.delete(&user.context, id, &projection(params)?).await?;
    Ok(mutated("User deleted", Some(row)))
}
