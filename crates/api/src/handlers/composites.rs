//! Handlers for the `/composites` resource.
//!
//! Compositing happens in the client; the server only answers whether a
//! stored result is still valid for the given constituents, and stores new
//! results.

use assetforge_core::composite::CompositeKind;
use assetforge_pipeline::CompositeRef;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::actor::Actor;
use crate::error::AppResult;
use crate::query::CompositeStoreParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /composites/lookup`.
#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub kind: String,
    pub owner_key: String,
    #[serde(default)]
    pub scope_key: String,
    pub constituents: Vec<String>,
}

/// POST /api/v1/composites/lookup
pub async fn lookup(
    State(state): State<AppState>,
    Json(input): Json<LookupRequest>,
) -> AppResult<impl IntoResponse> {
    let target = CompositeRef {
        kind: CompositeKind::from_name(&input.kind)?,
        owner_key: input.owner_key,
        scope_key: input.scope_key,
    };
    let result = state
        .forge
        .composites
        .lookup(&target, &input.constituents)
        .await?;
    Ok(Json(DataResponse { data: result }))
}

/// PUT /api/v1/composites/{kind}/{owner_key}?scope_key=..&constituents=a,b
///
/// The request body is the composited PNG.
pub async fn store(
    State(state): State<AppState>,
    actor: Actor,
    Path((kind, owner_key)): Path<(String, String)>,
    Query(params): Query<CompositeStoreParams>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let target = CompositeRef {
        kind: CompositeKind::from_name(&kind)?,
        owner_key,
        scope_key: params.scope_key.clone(),
    };
    let result = state
        .forge
        .composites
        .store(&target, &params.constituent_list(), body.to_vec(), actor.as_str())
        .await?;

    tracing::debug!(
        kind = %kind,
        owner_key = %target.owner_key,
        hash = %result.content_hash,
        "Composite stored"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}
