use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Audit log route, nested under `/audit`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(audit::list_audit))
}
