use crate::handlers::users::{create, delete, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/:id", get(read).patch(update).delete(delete))
}
