mod common;

use axum::http::{Method, StatusCode};
use celestial_api::auth::{LOCKED_OUT, NO_TOKEN};
use common::{email, TestApp, PASSWORD};
use serde_json::json;

fn tom() -> serde_json::Value {
    json!({"display_name": "Tom", "email_address": "tom@example.com", "password": PASSWORD})
}

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new();

    let (status, body) = app.post("/auth/register", None, tom()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], json!("NORMAL"));
    assert_eq!(body["data"]["enabled"], json!(true));
    assert!(body["data"].get("password_hash").is_none());
    assert!(body["data"].get("password").is_none());

    let (status, body) = app
        .post("/auth/login", None, json!({"email_address": "tom@example.com", "password": PASSWORD}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());
    assert!(body["data"]["expires_at"].as_str().is_some());
    assert_eq!(body["data"]["user"]["display_name"], json!("Tom"));
    assert!(body["data"]["user"].get("login_attempts").is_none());
}

#[tokio::test]
async fn tom_registers_then_locks_himself_out() {
    let app = TestApp::new();
    let (status, _) = app.post("/auth/register", None, tom()).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut as_admin = tom();
    as_admin["email_address"] = json!("tom2@example.com");
    as_admin["role"] = json!("ADMIN");
    let (status, body) = app.post("/auth/register", None, as_admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("User must register as a normal user"));

    let wrong = json!({"email_address": "tom@example.com", "password": "not-the-password"});
    let mut last = None;
    for _ in 0..6 {
        last = Some(app.post("/auth/login", None, wrong.clone()).await);
    }
    let (status, body) = last.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!(LOCKED_OUT));

    // The right password does not help while locked.
    let (status, body) = app
        .post("/auth/login", None, json!({"email_address": "tom@example.com", "password": PASSWORD}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!(LOCKED_OUT));
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = TestApp::new();
    app.post("/auth/register", None, tom()).await;
    let (status, _) = app.post("/auth/register", None, tom()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_alike() {
    let app = TestApp::new();
    app.post("/auth/register", None, tom()).await;
    let (s1, b1) = app
        .post("/auth/login", None, json!({"email_address": "nobody@example.com", "password": PASSWORD}))
        .await;
    let (s2, b2) = app
        .post("/auth/login", None, json!({"email_address": "tom@example.com", "password": "nope-nope"}))
        .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1["message"], b2["message"]);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new();
    app.post("/auth/register", None, tom()).await;
    let token = app.login("Tom").await;

    let (status, _) = app.get("/stars", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.request(Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Logged out"));

    let (status, _) = app.get("/stars", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.request(Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A fresh login still works.
    let again = app.login("Tom").await;
    let (status, _) = app.get("/stars", &again).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_or_bad_tokens_are_rejected() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/galaxies", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!(NO_TOKEN));

    let (status, _) = app.get("/galaxies", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_user_cannot_log_in() {
    let app = TestApp::new();
    let (_, root) = app.actor("Root", celestial_api::Role::SuperAdmin).await;
    let tom_id = app.seed_user("Tom", celestial_api::Role::Normal).await;

    let (status, _) = app.patch(&format!("/users/{}", tom_id), &root, json!({"enabled": false})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/auth/login", None, json!({"email_address": email("Tom"), "password": PASSWORD}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_login_bodies_get_the_error_envelope() {
    let app = TestApp::new();

    let (status, body) = app.post("/auth/login", None, json!({"email_address": "tom@example.com"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
    assert!(!body["message"].as_str().unwrap().contains("line 1"));

    let (status, body) = app
        .post("/auth/login", None, json!({"email_address": "tom@example.com", "password": 12345678}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());

    let (status, body) = app
        .send_raw("/auth/register", None, Some("application/json"), "{\"display_name\": ")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], json!("Request body is not valid JSON"));

    let (status, body) = app.send_raw("/auth/register", None, None, "display_name=Tom").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn health_and_version_are_public() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    let (status, body) = app.request(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], json!("ok"));

    let (status, body) = app.request(Method::GET, "/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("celestial-api"));
}
