//! Shared application state for all routes.

use crate::auth::{AuthService, PasswordHasher, TokenIssuer};
use crate::config::{Settings, MAX_TOKEN_TTL_MINUTES};
use crate::service::UserService;
use crate::store::Store;
use chrono::Duration;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, settings: Settings) -> Self {
        let users = Arc::new(UserService::new(store.clone(), PasswordHasher::new(settings.hash_cost)));
        // Builder-set values skip `Settings::check`; keep the lifetime in range here too.
        let ttl = Duration::minutes(settings.token_ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES));
        let tokens = TokenIssuer::new(&settings.jwt_secret, ttl);
        let auth = Arc::new(AuthService::new(store.clone(), users.clone(), tokens));
        AppState { store, auth, users, settings: Arc::new(settings) }
    }
}
