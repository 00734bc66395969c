use axum::routing::{post, put};
use axum::Router;

use crate::handlers::composites;
use crate::state::AppState;

/// Composite cache routes, nested under `/composites`.
///
/// ```text
/// POST   /lookup                lookup
/// PUT    /{kind}/{owner_key}    store (raw body = composited PNG)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lookup", post(composites::lookup))
        .route("/{kind}/{owner_key}", put(composites::store))
}
