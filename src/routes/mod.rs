//! Router assembly.

pub mod auth;
pub mod common;
pub mod resources;
pub mod users;

pub use auth::auth_routes;
pub use common::common_routes;
pub use resources::{catalog_routes, resource_routes};
pub use users::user_routes;

use crate::state::AppState;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The whole API with tracing and body limits applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .merge(auth_routes())
        .merge(user_routes())
        .merge(catalog_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
