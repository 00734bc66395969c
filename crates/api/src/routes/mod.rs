pub mod assets;
pub mod audit;
pub mod composites;
pub mod configurations;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /assets/generate                                  generate (POST)
/// /assets                                           list versions (GET)
/// /assets/{id}                                      get (GET)
/// /assets/{id}/approve                              approve (POST)
/// /assets/{id}/reject                               reject (POST)
/// /assets/{id}/regenerate                           regenerate (POST)
/// /assets/{id}/activate                             set active (POST)
/// /assets/{id}/archive                              archive (POST)
/// /assets/{id}/pipeline                             re-run pipeline (POST)
/// /assets/{id}/rejections                           rejection history (GET)
///
/// /configurations/{category}/{asset_key}            get, select sprite (GET, PUT)
/// /configurations/{category}/{asset_key}/publish    publish (POST)
/// /configurations/{category}/{asset_key}/unpublish  unpublish (POST)
///
/// /composites/lookup                                cache lookup (POST)
/// /composites/{kind}/{owner_key}                    store composite (PUT)
///
/// /audit                                            audit log (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/assets", assets::router())
        .nest("/configurations", configurations::router())
        .nest("/composites", composites::router())
        .nest("/audit", audit::router())
}
