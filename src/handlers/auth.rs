//! Register, login and logout.

use crate::error::AppError;
use crate::extractors::{AuthUser, JsonBody};
use crate::response::{created, mutated};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email_address: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.register(&body).await?;
    Ok(created("User registered", user))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.auth.login(&req.email_address, &req.password).await?;
    Ok(mutated("Login successful", Some(outcome)))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(&user.token).await?;
    Ok(mutated::<Value>("Logged out", None))
}
