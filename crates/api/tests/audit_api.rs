//! Integration tests for `/api/v1/audit` and actor attribution.

mod common;

use assetforge_imaging::mock::sprite_png;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app, generate, get, post_empty, put_bytes, TEST_ACTOR};
use tower::ServiceExt;

#[tokio::test]
async fn mutations_are_recorded_newest_first() {
    let app = build_test_app();
    let sheet = generate(&app, "effect_ref", "fire").await;
    let id = sheet["id"].as_i64().unwrap();
    post_empty(app.app(), &format!("/api/v1/assets/{id}/approve")).await;

    let response = get(
        app.app(),
        &format!("/api/v1/audit?entity_type=generated_asset&entity_id={id}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let entries = json["data"].as_array().unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["approve", "generation_completed", "generate"]);
    assert_eq!(entries[0]["actor"], TEST_ACTOR);
    assert_eq!(entries[1]["actor"], "system");
    assert_eq!(entries[2]["actor"], TEST_ACTOR);
    assert_eq!(entries[0]["details"]["previous_status"], "completed");
}

#[tokio::test]
async fn missing_actor_header_defaults_to_admin() {
    let app = build_test_app();
    let sheet = generate(&app, "effect_ref", "fire").await;
    let id = sheet["id"].as_i64().unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/assets/{id}/archive"))
        .body(Body::empty())
        .unwrap();
    let response = app.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(app.app(), "/api/v1/audit?limit=1").await).await;
    assert_eq!(json["data"][0]["action"], "archive");
    assert_eq!(json["data"][0]["actor"], "admin");
}

#[tokio::test]
async fn composite_store_and_scene_invalidation_are_recorded() {
    let app = build_test_app();
    let scene = "/api/v1/composites/scene/company_7?scope_key=office&constituents=desk:1,avatar:a";
    let response = put_bytes(app.app(), scene, sprite_png(48, 32, 0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // A new avatar hash drops the owner's cached scenes.
    let avatar = "/api/v1/composites/avatar/company_7?constituents=body:3,hat:5";
    let response = put_bytes(app.app(), avatar, sprite_png(32, 32, 0)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(get(app.app(), "/api/v1/audit?entity_type=composite").await).await;
    let entries = json["data"].as_array().unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["composites_invalidated", "composite_stored", "composite_stored"]
    );
    assert!(entries.iter().all(|e| e["actor"] == TEST_ACTOR));
    assert_eq!(entries[0]["details"]["owner_key"], "company_7");
    assert_eq!(entries[0]["details"]["removed"][0]["scope_key"], "office");
    assert_eq!(entries[1]["details"]["kind"], "avatar");
    assert_eq!(entries[2]["details"]["kind"], "scene");
}
