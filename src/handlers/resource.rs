//! Catalog resource handlers, generic over the resource type.

use super::{capitalized, parse_id, projection};
use crate::error::AppError;
use crate::extractors::{AuthUser, JsonBody, QueryPairs, QueryParams};
use crate::policy;
use crate::query::ListQuery;
use crate::resource::Resource;
use crate::response::{created, mutated, success_many, success_one};
use crate::service::Repository;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;

fn repository<R: Resource>(state: &AppState) -> Repository<R> {
    Repository::new(state.store.clone())
}

/// Creates, updates and deletes need a privileged, enabled account as stored now.
async fn authorize_mutation<R: Resource>(state: &AppState, user: &AuthUser) -> Result<(), AppError> {
    let actor = state.users.principal(&user.context).await?;
    policy::can_mutate(&actor, R::table()).into_result()
}

pub async fn list<R: Resource>(
    State(state): State<AppState>,
    _user: AuthUser,
    QueryParams(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let query = ListQuery::from_params(params, state.settings.default_page_size)?;
    let rows = repository::<R>(&state).find_all(&query).await?;
    Ok(success_many(rows))
}

pub async fn read<R: Resource>(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id_str): Path<String>,
    QueryParams(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = repository::<R>(&state).find_by_id(id, &projection(params)?).await?;
    Ok(success_one(row))
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    user: AuthUser,
    QueryParams(params): QueryPairs,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    authorize_mutation::<R>(&state, &user).await?;
    let row = repository::<R>(&state).create(&body, &projection(params)?).await?;
    Ok(created(format!("{} created", capitalized(R::table().label)), row))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id_str): Path<String>,
    QueryParams(params): QueryPairs,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    authorize_mutation::<R>(&state, &user).await?;
    let row = repository::<R>(&state).update(id, &body, &projection(params)?).await?;
    Ok(mutated(format!("{} updated", capitalized(R::table().label)), Some(row)))
}

pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id_str): Path<String>,
    QueryParams(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    authorize_mutation::<R>(&state, &user).await?;
    let row = repository::<R>(&state).delete(id, &projection(params)?).await?;
    Ok(mutated(format!("{} deleted", capitalized(R::table().label)), Some(row)))
}
