//! Integration tests for `/api/v1/composites`.

mod common;

use assetforge_imaging::mock::sprite_png;
use axum::http::StatusCode;
use common::{body_json, build_test_app, post_json, put_bytes};
use serde_json::json;

#[tokio::test]
async fn stored_avatar_is_found_by_lookup() {
    let app = build_test_app();
    let lookup = json!({
        "kind": "avatar",
        "owner_key": "company_7",
        "constituents": ["body:3", "hair:12"],
    });

    let miss =
        body_json(post_json(app.app(), "/api/v1/composites/lookup", lookup.clone()).await).await;
    assert_eq!(miss["data"]["cached"], false);
    assert!(miss["data"]["url"].is_null());

    let response = put_bytes(
        app.app(),
        "/api/v1/composites/avatar/company_7?constituents=hair:12,body:3",
        sprite_png(32, 32, 0),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = body_json(response).await;
    assert_eq!(stored["data"]["content_hash"], miss["data"]["content_hash"]);

    let hit = body_json(post_json(app.app(), "/api/v1/composites/lookup", lookup).await).await;
    assert_eq!(hit["data"]["cached"], true);
    assert_eq!(hit["data"]["url"], stored["data"]["url"]);
}

#[tokio::test]
async fn scene_lookup_uses_the_scope_key() {
    let app = build_test_app();
    put_bytes(
        app.app(),
        "/api/v1/composites/scene/company_7?scope_key=office&constituents=desk:1,avatar:abc",
        sprite_png(48, 32, 0),
    )
    .await;

    let office = body_json(
        post_json(
            app.app(),
            "/api/v1/composites/lookup",
            json!({
                "kind": "scene",
                "owner_key": "company_7",
                "scope_key": "office",
                "constituents": ["desk:1", "avatar:abc"],
            }),
        )
        .await,
    )
    .await;
    assert_eq!(office["data"]["cached"], true);

    let lobby = body_json(
        post_json(
            app.app(),
            "/api/v1/composites/lookup",
            json!({
                "kind": "scene",
                "owner_key": "company_7",
                "scope_key": "lobby",
                "constituents": ["desk:1", "avatar:abc"],
            }),
        )
        .await,
    )
    .await;
    assert_eq!(lobby["data"]["cached"], false);
}

#[tokio::test]
async fn unknown_kind_is_400() {
    let app = build_test_app();

    let response = post_json(
        app.app(),
        "/api/v1/composites/lookup",
        json!({ "kind": "banner", "owner_key": "company_7", "constituents": ["a"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn scene_without_template_is_400() {
    let app = build_test_app();

    let response = put_bytes(
        app.app(),
        "/api/v1/composites/scene/company_7?constituents=desk:1",
        sprite_png(48, 32, 0),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_body_is_400() {
    let app = build_test_app();

    let response = put_bytes(
        app.app(),
        "/api/v1/composites/avatar/company_7?constituents=body:3",
        Vec::new(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.objects.keys(assetforge_cloud::Tier::Public).is_empty());
}
