use assetforge_db::models::audit::AuditQuery;
use assetforge_db::store::AuditRepository;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::query::AuditParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/audit
///
/// Newest first. Filter by `entity_type` and `entity_id`.
pub async fn list_audit(
    State(state): State<AppState>,
    Query(params): Query<AuditParams>,
) -> AppResult<impl IntoResponse> {
    let query = AuditQuery {
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        limit: params.limit,
    };
    let entries = state.forge.services.store.list_audit(&query).await?;
    Ok(Json(DataResponse { data: entries }))
}
