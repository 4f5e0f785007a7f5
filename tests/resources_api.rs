mod common;

use axum::http::StatusCode;
use celestial_api::Role;
use common::TestApp;
use serde_json::{json, Value};

async fn create(app: &TestApp, token: &str, path: &str, body: Value) -> i64 {
    let (status, body) = app.post(path, Some(token), body).await;
    assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", path, body);
    body["data"]["id"].as_i64().unwrap()
}

fn names(body: &Value) -> Vec<&str> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect()
}

/// A galaxy with one star and that star's asteroids.
async fn solar_system(app: &TestApp, token: &str) -> (i64, i64) {
    let galaxy = create(app, token, "/galaxies", json!({"name": "Milky Way", "galaxy_type": "spiral"})).await;
    let star = create(app, token, "/stars", json!({"name": "Sun", "galaxy_id": galaxy, "spectral_type": "G2V"})).await;
    for name in ["Vesta", "Vesta Prime", "Ceres", "Pallas"] {
        create(app, token, "/asteroids", json!({"name": name, "star_id": star})).await;
    }
    (galaxy, star)
}

#[tokio::test]
async fn normal_users_read_but_never_write() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;
    let (_, tom) = app.actor("Tom", Role::Normal).await;
    let galaxy = create(&app, &admin, "/galaxies", json!({"name": "Andromeda"})).await;

    let (status, body) = app.get("/galaxies", &tom).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));

    let (status, body) = app.post("/galaxies", Some(&tom), json!({"name": "Triangulum"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("NORMAL users cannot modify galaxies"));

    let (status, _) = app.patch(&format!("/galaxies/{}", galaxy), &tom, json!({"galaxy_type": "spiral"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&format!("/galaxies/{}", galaxy), &tom).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_builds_the_hierarchy() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;
    let (_, star) = solar_system(&app, &admin).await;

    let planet = create(&app, &admin, "/planets", json!({"name": "Earth", "star_id": star, "habitable": true})).await;
    let (status, body) = app.post("/moons", Some(&admin), json!({"name": "Luna", "planet_id": planet})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], json!("Moon created"));
    assert_eq!(body["data"]["planet_id"], json!(planet));

    let (status, body) = app
        .patch(&format!("/planets/{}", planet), &admin, json!({"radius_km": 6371.0}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Planet updated"));
    assert_eq!(body["data"]["radius_km"], json!(6371.0));
    assert_eq!(body["data"]["name"], json!("Earth"));
}

#[tokio::test]
async fn text_filters_are_exact() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;
    solar_system(&app, &admin).await;

    let (status, body) = app.get("/asteroids?name=Vesta", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Vesta"]);

    let (_, body) = app.get("/asteroids?name=Vesta&name=Ceres", &admin).await;
    assert_eq!(names(&body), vec!["Vesta", "Ceres"]);

    // Unknown columns are not filters.
    let (_, body) = app.get("/asteroids?colour=red", &admin).await;
    assert_eq!(body["count"], json!(4));
}

#[tokio::test]
async fn sorting_and_paging() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;
    solar_system(&app, &admin).await;

    let (_, body) = app.get("/asteroids?sortBy=name&sortOrder=desc", &admin).await;
    assert_eq!(names(&body), vec!["Vesta Prime", "Vesta", "Pallas", "Ceres"]);

    let (_, body) = app.get("/asteroids?amount=3&page=2", &admin).await;
    assert_eq!(names(&body), vec!["Pallas"]);
    assert_eq!(body["count"], json!(1));

    let (_, body) = app.get("/asteroids?amount=2&page=1&fields=name", &admin).await;
    assert_eq!(body["data"], json!([{"name": "Vesta"}, {"name": "Vesta Prime"}]));
}

#[tokio::test]
async fn bad_query_input_is_rejected() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;
    solar_system(&app, &admin).await;

    let (status, _) = app.get("/asteroids?sortBy=colour", &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.get("/asteroids?star_id=sun", &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.get("/asteroids/abc", &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/asteroids/999", &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("No asteroid found with id 999"));
}

#[tokio::test]
async fn parents_with_children_cannot_be_deleted() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;
    let (galaxy, star) = solar_system(&app, &admin).await;
    let planet = create(&app, &admin, "/planets", json!({"name": "Mars", "star_id": star})).await;

    let (status, _) = app.delete(&format!("/stars/{}", star), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.delete(&format!("/galaxies/{}", galaxy), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.get(&format!("/stars/{}", star), &admin).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/planets/{}", planet), &admin).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete(&format!("/planets/{}", planet), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Planet deleted"));
}

#[tokio::test]
async fn one_meteor_shower_per_constellation() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;
    let orion = create(&app, &admin, "/constellations", json!({"name": "Orion", "abbreviation": "Ori"})).await;
    let gemini = create(&app, &admin, "/constellations", json!({"name": "Gemini", "abbreviation": "Gem"})).await;

    let orionids = create(
        &app,
        &admin,
        "/meteor-showers",
        json!({"name": "Orionids", "constellation_id": orion, "peak_date": "2024-10-21"}),
    )
    .await;

    let (status, body) = app
        .post("/meteor-showers", Some(&admin), json!({"name": "Second", "constellation_id": orion}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already exists"));

    create(&app, &admin, "/meteor-showers", json!({"name": "Geminids", "constellation_id": gemini})).await;
    let (status, _) = app
        .patch(&format!("/meteor-showers/{}", orionids), &admin, json!({"constellation_id": gemini}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Re-asserting the current owner is fine.
    let (status, _) = app
        .patch(&format!("/meteor-showers/{}", orionids), &admin, json!({"constellation_id": orion}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_bodies_are_rejected() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;

    let (status, body) = app.post("/galaxies", Some(&admin), json!({"galaxy_type": "spiral"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], json!("name is required"));

    let (status, body) = app.post("/galaxies", Some(&admin), json!({"name": "X", "mass": 1})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], json!("unknown field: mass"));

    let (status, _) = app.post("/galaxies", Some(&admin), json!({"name": "X", "id": 7})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn mutations_honor_the_fields_projection() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;

    let (status, body) = app
        .post("/galaxies?fields=name", Some(&admin), json!({"name": "Whirlpool", "galaxy_type": "spiral"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"], json!({"name": "Whirlpool"}));

    let (_, listed) = app.get("/galaxies?name=Whirlpool", &admin).await;
    let id = listed["data"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .patch(&format!("/galaxies/{}?fields=id,galaxy_type", id), &admin, json!({"galaxy_type": "grand design"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"id": id, "galaxy_type": "grand design"}));

    let (status, _) = app
        .patch(&format!("/galaxies/{}?fields=mass", id), &admin, json!({"galaxy_type": "barred"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.delete(&format!("/galaxies/{}?fields=name", id), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"name": "Whirlpool"}));
}

#[tokio::test]
async fn malformed_resource_bodies_get_the_error_envelope() {
    let app = TestApp::new();
    let (_, admin) = app.actor("Ada", Role::Admin).await;

    let (status, body) = app.send_raw("/galaxies", Some(&admin), Some("application/json"), "{not json").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], json!("Request body is not valid JSON"));

    let (status, body) = app.send_raw("/galaxies", Some(&admin), None, "{\"name\": \"M87\"}").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

