//! Shared harness: the full router over an in-memory store.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use celestial_api::{app, AppState, HashCost, MemoryStore, Role, Settings, Store};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let settings = Settings::default()
            .with_jwt_secret("integration-test-secret")
            .with_hash_cost(HashCost::cheap());
        let state = AppState::new(store, settings);
        let router = app(state.clone());
        TestApp { state, router }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let req = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&b).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    /// Send `body` as-is, with an optional content type.
    pub async fn send_raw(&self, uri: &str, token: Option<&str>, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::POST).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let res = self.router.clone().oneshot(builder.body(Body::from(body.to_string())).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()));
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Store a user with `role` directly, bypassing registration rules.
    pub async fn seed_user(&self, name: &str, role: Role) -> i64 {
        let rec = self
            .state
            .users
            .create_account(
                &json!({
                    "display_name": name,
                    "email_address": email(name),
                    "password": PASSWORD,
                }),
                role,
            )
            .await
            .unwrap();
        rec["id"].as_i64().unwrap()
    }

    pub async fn login(&self, name: &str) -> String {
        let (status, body) = self
            .post("/auth/login", None, json!({"email_address": email(name), "password": PASSWORD}))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Seed a user and log in as them.
    pub async fn actor(&self, name: &str, role: Role) -> (i64, String) {
        let id = self.seed_user(name, role).await;
        (id, self.login(name).await)
    }
}

pub fn email(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase())
}
