//! Bearer-token extractor for authenticated routes.

use crate::auth::{bearer_token, AuthContext};
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// The authenticated caller and the raw token it presented.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub context: AuthContext,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v: &axum::http::HeaderValue| v.to_str().ok());
        let context = state.auth.authenticate(header).await?;
        let token = bearer_token(header).unwrap_or_default().to_string();
        Ok(AuthUser { context, token })
    }
}
