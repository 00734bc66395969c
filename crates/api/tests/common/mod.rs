#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use assetforge_api::actor::ACTOR_HEADER;
use assetforge_api::config::ServerConfig;
use assetforge_api::router::build_app_router;
use assetforge_api::state::AppState;
use assetforge_cloud::memory::MemoryObjectStore;
use assetforge_core::category::ALL_CATEGORIES;
use assetforge_core::prompt::{PromptLibrary, CATEGORY_WILDCARD};
use assetforge_db::models::status::PipelineStatus;
use assetforge_db::store::{AssetRepository, MemoryStore};
use assetforge_events::EventBus;
use assetforge_imaging::mock::{MockBackgroundRemover, MockGenerator, MockResizer};
use assetforge_pipeline::{Forge, PipelineConfig, Services};
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const TEST_ACTOR: &str = "reviewer";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// The router plus the in-memory backends behind it.
pub struct TestApp {
    pub router: Router,
    pub forge: Forge,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub generator: Arc<MockGenerator>,
}

impl TestApp {
    /// A fresh clone of the router for one request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Wait until the background pipeline run for `id` has finished.
    pub async fn wait_for_pipeline(&self, id: i64) -> PipelineStatus {
        for _ in 0..200 {
            let row = self.store.find_asset(id).await.unwrap().unwrap();
            match row.pipeline_status() {
                Some(PipelineStatus::Processing) | None => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Some(done) => return done,
            }
        }
        panic!("pipeline for asset {id} did not finish");
    }
}

/// Build the full application router over in-memory backends and mock
/// remote services, with a template for every category.
pub fn build_test_app() -> TestApp {
    build_test_app_with(MockGenerator::new())
}

pub fn build_test_app_with(generator: MockGenerator) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let objects = Arc::new(MemoryObjectStore::default());
    let generator = Arc::new(generator);
    let prompts = ALL_CATEGORIES.iter().fold(PromptLibrary::new(), |lib, c| {
        lib.with(*c, CATEGORY_WILDCARD, format!("Isometric {} {{asset_key}}", c.name()))
    });

    let services = Services {
        store: store.clone(),
        objects: objects.clone(),
        generator: generator.clone(),
        remover: Arc::new(MockBackgroundRemover::new()),
        resizer: Arc::new(MockResizer::new()),
        events: Arc::new(EventBus::default()),
        prompts: Arc::new(prompts),
        config: PipelineConfig::default(),
    };
    let (forge, _worker) =
        Forge::start(services, tokio_util::sync::CancellationToken::new());

    let config = test_config();
    let state = AppState {
        forge: forge.clone(),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        forge,
        store,
        objects,
        generator,
    }
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::PUT, uri, body).await
}

/// POST with no body.
pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(ACTOR_HEADER, TEST_ACTOR)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn put_bytes(app: Router, uri: &str, bytes: Vec<u8>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(CONTENT_TYPE, "image/png")
        .header(ACTOR_HEADER, TEST_ACTOR)
        .body(Body::from(bytes))
        .unwrap();
    send(app, request).await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(ACTOR_HEADER, TEST_ACTOR)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Generate `(category, asset_key)` through the API and return the row.
pub async fn generate(app: &TestApp, category: &str, asset_key: &str) -> serde_json::Value {
    let response = post_json(
        app.app(),
        "/api/v1/assets/generate",
        serde_json::json!({ "category": category, "asset_key": asset_key }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
