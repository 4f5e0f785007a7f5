//! celestial-api: an astronomy catalog REST backend with role-based access,
//! login lockout and token revocation.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod policy;
pub mod query;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::{AuthService, Role};
pub use config::{validate_catalog, HashCost, Settings};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use response::{created, mutated, success_many, success_one};
pub use routes::app;
pub use service::{Repository, UserService};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};
