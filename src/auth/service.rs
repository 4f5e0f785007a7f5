//! Register, login with lockout, logout with revocation, and request
//! authentication.

use super::lockout::{lock_state, LockState};
use super::token::{token_digest, TokenIssuer};
use super::types::{AuthContext, Credential, IssuedToken, Principal, Role};
use crate::error::AppError;
use crate::query::{Projection, Record, Scalar};
use crate::resource::USERS;
use crate::service::{body_to_map, UserService};
use crate::store::{RevokedToken, Store};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const NO_TOKEN: &str = "No token provided";
pub const LOCKED_OUT: &str = "Maximum login attempts reached. Please try again later";
const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: Record,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    users: Arc<UserService>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, users: Arc<UserService>, tokens: TokenIssuer) -> Self {
        AuthService { store, users, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Self-service sign-up; always creates a NORMAL, enabled user.
    pub async fn register(&self, body: &Value) -> Result<Record, AppError> {
        let mut fields = body_to_map(body)?.clone();
        match fields.remove("role") {
            None | Some(Value::Null) => {}
            Some(Value::String(r)) if r == Role::Normal.as_str() => {}
            Some(_) => return Err(AppError::Forbidden("User must register as a normal user".into())),
        }
        fields.remove("enabled");
        let user = self.users.create_account(&Value::Object(fields), Role::Normal).await?;
        info!(user_id = ?user.get("id"), "registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        self.login_at(email, password, Utc::now()).await
    }

    /// Login evaluated at `now`.
    pub async fn login_at(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<LoginOutcome, AppError> {
        let record = self
            .users
            .repository()
            .fetch_by("email_address", Scalar::Text(email.to_string()))
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.into()))?;
        let principal = Principal::from_record(&record)?;
        if !principal.enabled {
            warn!(user_id = principal.id, "login to disabled account");
            return Err(AppError::Forbidden("User account is disabled".into()));
        }

        let credential = Credential::from_record(&record)?;
        if let LockState::Locked { until } = lock_state(credential.login_attempts, credential.last_login_attempt_at, now) {
            warn!(user_id = principal.id, %until, "login while locked");
            return Err(AppError::Unauthorized(LOCKED_OUT.into()));
        }

        let matches = self
            .users
            .passwords()
            .verify_blocking(password.to_string(), credential.password_hash.clone())
            .await?;
        if !matches {
            let attempts = self.store.record_failed_login(principal.id, now).await?;
            warn!(user_id = principal.id, attempts, "failed login");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
        }

        self.store.reset_login_attempts(principal.id).await?;
        let display_name = record
            .get("display_name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let context = AuthContext { id: principal.id, display_name, role: principal.role };
        let token = self.tokens.issue_at(&context, now)?;
        info!(user_id = principal.id, "logged in");
        Ok(LoginOutcome { token, user: Projection::all().apply(&USERS, record) })
    }

    /// Revoke `token` until it would have expired. Idempotent.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        let claims = self.tokens.decode(token)?;
        self.store
            .revoke_token(RevokedToken { token_hash: token_digest(token), expires_at: claims.expires_at() })
            .await?;
        info!(user_id = %claims.sub, "logged out");
        Ok(())
    }

    /// Validate an `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<AuthContext, AppError> {
        let token = bearer_token(header).ok_or_else(|| AppError::Unauthorized(NO_TOKEN.into()))?;
        self.authenticate_token(token).await
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<AuthContext, AppError> {
        let claims = self.tokens.decode(token)?;
        if self.store.is_token_revoked(&token_digest(token)).await? {
            return Err(AppError::Unauthorized("Token has been revoked".into()));
        }
        claims.context()
    }

    /// Drop revocations for tokens that have expired anyway.
    pub async fn purge_expired_revocations(&self) -> Result<u64, AppError> {
        self.purge_expired_revocations_at(Utc::now()).await
    }

    /// Purge as seen at `now`. A token still decodes during the whole second
    /// named by its `exp`, so its revocation is kept one second past that.
    pub async fn purge_expired_revocations_at(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let purged = self
            .store
            .purge_expired_revocations(now - Duration::seconds(1))
            .await?;
        if purged > 0 {
            info!(purged, "purged expired revocations");
        }
        Ok(purged)
    }
}

/// The token from `Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PasswordHasher, MAX_LOGIN_ATTEMPTS};
    use crate::config::HashCost;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn service() -> AuthService {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let users = Arc::new(UserService::new(store.clone(), PasswordHasher::new(HashCost::cheap())));
        AuthService::new(store, users, TokenIssuer::new("test-secret", Duration::minutes(60)))
    }

    async fn register_tom(auth: &AuthService) {
        auth.register(&json!({
            "display_name": "Tom",
            "email_address": "tom@example.com",
            "password": "password123",
        }))
        .await
        .unwrap();
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[tokio::test]
    async fn register_refuses_privileged_roles() {
        let auth = service();
        for role in ["ADMIN", "SUPER_ADMIN", "ROOT"] {
            let err = auth
                .register(&json!({
                    "display_name": "Eve",
                    "email_address": "eve@example.com",
                    "password": "password123",
                    "role": role,
                }))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "User must register as a normal user");
        }
        assert!(auth.login("eve@example.com", "password123").await.is_err());
    }

    #[tokio::test]
    async fn lockout_ignores_the_password_and_decays() {
        let auth = service();
        register_tom(&auth).await;
        let t0 = Utc::now();

        for _ in 0..5 {
            let err = auth.login_at("tom@example.com", "wrong-pass", t0).await.unwrap_err();
            assert_eq!(err.to_string(), "Invalid email or password");
        }
        let err = auth.login_at("tom@example.com", "password123", t0).await.unwrap_err();
        assert_eq!(err.to_string(), LOCKED_OUT);

        let later = t0 + Duration::minutes(11);
        let err = auth.login_at("tom@example.com", "wrong-pass", later).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        let err = auth.login_at("tom@example.com", "password123", later).await.unwrap_err();
        assert_eq!(err.to_string(), LOCKED_OUT);

        let much_later = later + Duration::minutes(11);
        auth.login_at("tom@example.com", "password123", much_later).await.unwrap();
    }

    #[tokio::test]
    async fn success_resets_the_counter() {
        let auth = service();
        register_tom(&auth).await;
        for _ in 0..4 {
            assert!(auth.login("tom@example.com", "wrong-pass").await.is_err());
        }
        auth.login("tom@example.com", "password123").await.unwrap();
        for _ in 0..4 {
            assert!(auth.login("tom@example.com", "wrong-pass").await.is_err());
        }
        auth.login("tom@example.com", "password123").await.unwrap();
    }

    #[tokio::test]
    async fn logged_out_token_never_authenticates_again() {
        let auth = service();
        register_tom(&auth).await;
        let out = auth.login("tom@example.com", "password123").await.unwrap();
        let header = format!("Bearer {}", out.token.token);

        let ctx = auth.authenticate(Some(&header)).await.unwrap();
        assert_eq!(ctx.display_name, "Tom");
        assert_eq!(ctx.role, Role::Normal);

        auth.logout(&out.token.token).await.unwrap();
        auth.logout(&out.token.token).await.unwrap();
        assert!(matches!(auth.authenticate(Some(&header)).await, Err(AppError::Unauthorized(_))));
        assert_eq!(auth.purge_expired_revocations().await.unwrap(), 0);
        assert!(auth.authenticate(Some(&header)).await.is_err());
    }

    #[tokio::test]
    async fn missing_header_is_reported() {
        let auth = service();
        let err = auth.authenticate(None).await.unwrap_err();
        assert_eq!(err.to_string(), NO_TOKEN);
    }

    #[tokio::test]
    async fn revocation_outlives_the_expiry_second() {
        let auth = service();
        register_tom(&auth).await;
        let out = auth.login("tom@example.com", "password123").await.unwrap();
        let exp = auth.tokens().decode(&out.token.token).unwrap().expires_at();
        auth.logout(&out.token.token).await.unwrap();
        let digest = token_digest(&out.token.token);

        let inside = exp + Duration::milliseconds(500);
        assert_eq!(auth.purge_expired_revocations_at(inside).await.unwrap(), 0);
        assert!(auth.store.is_token_revoked(&digest).await.unwrap());

        let after = exp + Duration::milliseconds(1001);
        assert_eq!(auth.purge_expired_revocations_at(after).await.unwrap(), 1);
        assert!(!auth.store.is_token_revoked(&digest).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failures_are_all_counted() {
        let auth = Arc::new(service());
        register_tom(&auth).await;
        let t0 = Utc::now();

        let mut attempts = tokio::task::JoinSet::new();
        for _ in 0..MAX_LOGIN_ATTEMPTS {
            let auth = auth.clone();
            attempts.spawn(async move { auth.login_at("tom@example.com", "wrong-pass", t0).await });
        }
        while let Some(joined) = attempts.join_next().await {
            let err = joined.unwrap().unwrap_err();
            assert_eq!(err.to_string(), BAD_CREDENTIALS);
        }

        let stored = auth
            .users
            .repository()
            .fetch_by("email_address", Scalar::Text("tom@example.com".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["login_attempts"], json!(MAX_LOGIN_ATTEMPTS));

        let err = auth.login_at("tom@example.com", "password123", t0).await.unwrap_err();
        assert_eq!(err.to_string(), LOCKED_OUT);
    }
}
