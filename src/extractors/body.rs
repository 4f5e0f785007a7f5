//! JSON body and query-string extractors whose failures use the `{message}` envelope.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{
        rejection::JsonRejection,
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

/// `Json<T>`, rejected as a 409 validation error.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

/// `Query<T>`, rejected as a 409 validation error.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

/// Query pairs in request order; a repeated key appears once per value.
pub type QueryPairs = QueryParams<Vec<(String, String)>>;

fn body_error(rejection: &JsonRejection) -> AppError {
    tracing::debug!(error = %rejection.body_text(), "rejected request body");
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => "Request body must be sent as application/json",
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
        JsonRejection::JsonDataError(_) => "Request body is missing fields or has fields of the wrong type",
        _ => "Request body could not be read",
    };
    AppError::Validation(message.into())
}

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(body_error(&rejection)),
        }
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected query string");
                Err(AppError::Validation("Query string could not be parsed".into()))
            }
        }
    }
}
