//! Handlers for the `/assets` resource: generation, version history and the
//! review workflow.

use assetforge_core::category::AssetCategory;
use assetforge_core::error::CoreError;
use assetforge_core::types::DbId;
use assetforge_db::models::generated_asset::{AssetQuery, GeneratedAsset};
use assetforge_db::models::rejection::AssetRejection;
use assetforge_db::models::status::AssetStatus;
use assetforge_db::store::AssetRepository;
use assetforge_pipeline::{GenerateRequest, PipelineTrigger, RegenerateOverrides};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::{AppError, AppResult};
use crate::query::AssetListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /assets/{id}/reject`.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
    #[serde(default = "default_true")]
    pub incorporate_feedback: bool,
}

fn default_true() -> bool {
    true
}

/// Response for `POST /assets/{id}/approve`.
#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub data: GeneratedAsset,
    pub pipeline: PipelineTrigger,
    pub dependents_enqueued: Vec<GeneratedAsset>,
}

#[derive(Debug, Serialize)]
pub struct RejectionResult {
    pub asset: GeneratedAsset,
    pub rejection: AssetRejection,
}

#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub pipeline: PipelineTrigger,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/assets/generate
///
/// Create and generate a new version. A remote failure still answers 201
/// with the row in `failed` status and `error_message` set.
pub async fn generate(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<GenerateRequest>,
) -> AppResult<impl IntoResponse> {
    let asset = state
        .forge
        .orchestrator
        .generate(input, actor.as_str())
        .await?;

    tracing::info!(
        asset_id = asset.id,
        category = %asset.category,
        asset_key = %asset.asset_key,
        variant = asset.variant,
        status = %asset.status(),
        "Generation finished"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /api/v1/assets
pub async fn list_assets(
    State(state): State<AppState>,
    Query(params): Query<AssetListParams>,
) -> AppResult<impl IntoResponse> {
    if let (Some(category), Some(asset_key)) = (&params.category, &params.asset_key) {
        let versions = state
            .forge
            .approval
            .list_versions(category, asset_key)
            .await?;
        return Ok(Json(DataResponse { data: versions }));
    }

    if let Some(category) = &params.category {
        AssetCategory::from_name(category)?;
    }
    if let Some(status) = &params.status {
        if AssetStatus::from_name(status).is_none() {
            return Err(AppError::BadRequest(format!("Unknown status '{status}'")));
        }
    }

    let query = AssetQuery {
        category: params.category,
        asset_key: params.asset_key,
        status: params.status,
        limit: params.limit,
        offset: params.offset,
    };
    let assets = state.forge.services.store.list_assets(&query).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// GET /api/v1/assets/{id}
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let asset = state
        .forge
        .services
        .store
        .find_asset(id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "generated_asset",
            id,
        })?;
    Ok(Json(DataResponse { data: asset }))
}

/// POST /api/v1/assets/{id}/approve
///
/// Approve and activate a version. Sprites get a pipeline run queued;
/// reference sheets enqueue their dependent sprites.
pub async fn approve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.forge.approval.approve(id, actor.as_str()).await?;

    tracing::info!(
        asset_id = id,
        actor = %actor.as_str(),
        pipeline = ?outcome.pipeline,
        dependents = outcome.dependents_enqueued.len(),
        "Asset approved"
    );

    Ok(Json(ApproveResponse {
        data: outcome.asset,
        pipeline: outcome.pipeline,
        dependents_enqueued: outcome.dependents_enqueued,
    }))
}

/// POST /api/v1/assets/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(input): Json<RejectRequest>,
) -> AppResult<impl IntoResponse> {
    let (asset, rejection) = state
        .forge
        .approval
        .reject(id, &input.reason, input.incorporate_feedback, actor.as_str())
        .await?;

    tracing::info!(
        asset_id = id,
        actor = %actor.as_str(),
        incorporate_feedback = input.incorporate_feedback,
        "Asset rejected"
    );

    Ok(Json(DataResponse {
        data: RejectionResult { asset, rejection },
    }))
}

/// POST /api/v1/assets/{id}/regenerate
///
/// Generate a new version of the same key. Body fields override the
/// source row; `{}` inherits everything.
pub async fn regenerate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
    Json(overrides): Json<RegenerateOverrides>,
) -> AppResult<impl IntoResponse> {
    let asset = state
        .forge
        .approval
        .regenerate(id, overrides, actor.as_str())
        .await?;

    tracing::info!(
        source_id = id,
        asset_id = asset.id,
        variant = asset.variant,
        "Asset regenerated"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// POST /api/v1/assets/{id}/activate
pub async fn activate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let asset = state.forge.approval.set_active(id, actor.as_str()).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// POST /api/v1/assets/{id}/archive
pub async fn archive(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let asset = state.forge.approval.archive(id, actor.as_str()).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// POST /api/v1/assets/{id}/pipeline
///
/// Queue a post-approval run. Answers 202; progress arrives as events and
/// on the row's `pipeline_status`.
pub async fn rerun_pipeline(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let pipeline = state
        .forge
        .approval
        .rerun_pipeline(id, actor.as_str())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: PipelineResult { pipeline },
        }),
    ))
}

/// GET /api/v1/assets/{id}/rejections
pub async fn list_rejections(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let rejections = state.forge.approval.list_rejections(id).await?;
    Ok(Json(DataResponse { data: rejections }))
}
