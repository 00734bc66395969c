//! Handlers for the `/configurations` resource: which approved sprite the
//! live game shows for a key, and whether it is published.

use assetforge_core::types::DbId;
use assetforge_pipeline::SpriteOverrides;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::actor::Actor;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /configurations/{category}/{asset_key}`.
#[derive(Debug, Deserialize)]
pub struct SelectSpriteRequest {
    pub asset_id: DbId,
    pub cost_override: Option<f64>,
    pub scale_override: Option<f64>,
}

/// GET /api/v1/configurations/{category}/{asset_key}
pub async fn get_configuration(
    State(state): State<AppState>,
    Path((category, asset_key)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let config = state.forge.configurations.find(&category, &asset_key).await?;
    Ok(Json(DataResponse { data: config }))
}

/// PUT /api/v1/configurations/{category}/{asset_key}
///
/// Select an approved version as the live sprite. Publication state is
/// left as it was.
pub async fn select_sprite(
    State(state): State<AppState>,
    actor: Actor,
    Path((category, asset_key)): Path<(String, String)>,
    Json(input): Json<SelectSpriteRequest>,
) -> AppResult<impl IntoResponse> {
    let overrides = SpriteOverrides {
        cost_override: input.cost_override,
        scale_override: input.scale_override,
    };
    let config = state
        .forge
        .configurations
        .select_sprite(&category, &asset_key, input.asset_id, overrides, actor.as_str())
        .await?;

    tracing::info!(
        category = %category,
        asset_key = %asset_key,
        asset_id = input.asset_id,
        "Sprite selected"
    );

    Ok(Json(DataResponse { data: config }))
}

/// POST /api/v1/configurations/{category}/{asset_key}/publish
pub async fn publish(
    State(state): State<AppState>,
    actor: Actor,
    Path((category, asset_key)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let config = state
        .forge
        .configurations
        .publish(&category, &asset_key, actor.as_str())
        .await?;
    Ok(Json(DataResponse { data: config }))
}

/// POST /api/v1/configurations/{category}/{asset_key}/unpublish
pub async fn unpublish(
    State(state): State<AppState>,
    actor: Actor,
    Path((category, asset_key)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let config = state
        .forge
        .configurations
        .unpublish(&category, &asset_key, actor.as_str())
        .await?;
    Ok(Json(DataResponse { data: config }))
}
