//! One router per catalog resource type.

use crate::handlers::resource::{create, delete, list, read, update};
use crate::resource::{Asteroid, Constellation, Galaxy, MeteorShower, Moon, Planet, Resource, Star};
use crate::state::AppState;
use axum::{routing::get, Router};

/// GET/POST /<path>, GET/PATCH/DELETE /<path>/:id for `R`.
pub fn resource_routes<R: Resource>() -> Router<AppState> {
    let path = R::table().path;
    Router::new()
        .route(&format!("/{}", path), get(list::<R>).post(create::<R>))
        .route(
            &format!("/{}/:id", path),
            get(read::<R>).patch(update::<R>).delete(delete::<R>),
        )
}

/// Routes for every catalog resource.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .merge(resource_routes::<Galaxy>())
        .merge(resource_routes::<Constellation>())
        .merge(resource_routes::<Star>())
        .merge(resource_routes::<Planet>())
        .merge(resource_routes::<Moon>())
        .merge(resource_routes::<Asteroid>())
        .merge(resource_routes::<MeteorShower>())
}
