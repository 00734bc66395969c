use axum::routing::{get, post};
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Asset version routes, nested under `/assets`.
///
/// ```text
/// POST   /generate             generate
/// GET    /                     list_assets
/// GET    /{id}                 get_asset
/// POST   /{id}/approve         approve
/// POST   /{id}/reject          reject
/// POST   /{id}/regenerate      regenerate
/// POST   /{id}/activate        activate
/// POST   /{id}/archive         archive
/// POST   /{id}/pipeline        rerun_pipeline
/// GET    /{id}/rejections      list_rejections
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(assets::generate))
        .route("/", get(assets::list_assets))
        .route("/{id}", get(assets::get_asset))
        .route("/{id}/approve", post(assets::approve))
        .route("/{id}/reject", post(assets::reject))
        .route("/{id}/regenerate", post(assets::regenerate))
        .route("/{id}/activate", post(assets::activate))
        .route("/{id}/archive", post(assets::archive))
        .route("/{id}/pipeline", post(assets::rerun_pipeline))
        .route("/{id}/rejections", get(assets::list_rejections))
}
