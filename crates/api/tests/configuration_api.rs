//! Integration tests for `/api/v1/configurations`.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, generate, get, post_empty, put_json, TestApp};
use serde_json::json;

/// Approve `effect_ref/fire`, then generate and approve `effect/fire`,
/// waiting for its pipeline run. Returns the sprite id.
async fn published_fire_sprite(app: &TestApp) -> i64 {
    let sheet = generate(app, "effect_ref", "fire").await;
    post_empty(app.app(), &format!("/api/v1/assets/{}/approve", sheet["id"])).await;
    let sprite = generate(app, "effect", "fire").await;
    let id = sprite["id"].as_i64().unwrap();
    post_empty(app.app(), &format!("/api/v1/assets/{id}/approve")).await;
    app.wait_for_pipeline(id).await;
    id
}

#[tokio::test]
async fn missing_configuration_is_404() {
    let app = build_test_app();

    let response = get(app.app(), "/api/v1/configurations/effect/fire").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn select_then_publish_and_unpublish() {
    let app = build_test_app();
    let sprite_id = published_fire_sprite(&app).await;

    let response = put_json(
        app.app(),
        "/api/v1/configurations/effect/fire",
        json!({ "asset_id": sprite_id, "scale_override": 1.5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let config = body_json(response).await["data"].clone();
    assert_eq!(config["active_sprite_id"], sprite_id);
    assert_eq!(config["scale_override"], 1.5);
    assert_eq!(config["is_published"], false);

    let published = body_json(
        post_empty(app.app(), "/api/v1/configurations/effect/fire/publish").await,
    )
    .await;
    assert_eq!(published["data"]["is_published"], true);
    assert!(published["data"]["published_at"].is_string());

    let unpublished = body_json(
        post_empty(app.app(), "/api/v1/configurations/effect/fire/unpublish").await,
    )
    .await;
    assert_eq!(unpublished["data"]["is_published"], false);

    let fetched = body_json(get(app.app(), "/api/v1/configurations/effect/fire").await).await;
    assert_eq!(fetched["data"]["active_sprite_id"], sprite_id);
    assert_eq!(fetched["data"]["scale_override"], 1.5);
}

#[tokio::test]
async fn only_approved_versions_can_be_selected() {
    let app = build_test_app();
    let sheet = generate(&app, "effect_ref", "fire").await;

    let response = put_json(
        app.app(),
        "/api/v1/configurations/effect_ref/fire",
        json!({ "asset_id": sheet["id"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn selection_must_match_the_key() {
    let app = build_test_app();
    let sprite_id = published_fire_sprite(&app).await;

    let response = put_json(
        app.app(),
        "/api/v1/configurations/effect/smoke",
        json!({ "asset_id": sprite_id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn publishing_without_a_selection_is_404() {
    let app = build_test_app();

    let response = post_empty(app.app(), "/api/v1/configurations/effect/fire/publish").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
