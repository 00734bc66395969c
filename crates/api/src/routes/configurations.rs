use axum::routing::{get, post};
use axum::Router;

use crate::handlers::configurations;
use crate::state::AppState;

/// Live-game configuration routes, nested under `/configurations`.
///
/// ```text
/// GET    /{category}/{asset_key}             get_configuration
/// PUT    /{category}/{asset_key}             select_sprite
/// POST   /{category}/{asset_key}/publish     publish
/// POST   /{category}/{asset_key}/unpublish   unpublish
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{category}/{asset_key}",
            get(configurations::get_configuration).put(configurations::select_sprite),
        )
        .route("/{category}/{asset_key}/publish", post(configurations::publish))
        .route(
            "/{category}/{asset_key}/unpublish",
            post(configurations::unpublish),
        )
}
