//! Generated asset versions: one row per generation attempt.

use assetforge_core::category::AssetCategory;
use assetforge_core::error::CoreError;
use assetforge_core::references::ReferenceSpec;
use assetforge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::status::{AssetStatus, PipelineStatus, StatusId};

/// A row from the `generated_assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedAsset {
    pub id: DbId,
    pub category: String,
    pub asset_key: String,
    pub variant: i32,
    pub sprite_variant: Option<String>,
    pub parent_asset_id: Option<DbId>,
    pub status_id: StatusId,
    pub pipeline_status_id: Option<StatusId>,
    pub is_active: bool,
    pub background_removed: bool,
    /// Raw generation output. Never repointed, so pipeline re-runs start here.
    pub original_key: Option<String>,
    pub private_key: Option<String>,
    pub processed_key: Option<String>,
    pub public_key: Option<String>,
    pub public_url: Option<String>,
    pub base_prompt: String,
    pub current_prompt: String,
    pub prompt_version: i32,
    pub rejection_count: i32,
    pub generation_settings: serde_json::Value,
    pub generation_model: Option<String>,
    pub references: Json<Vec<ReferenceSpec>>,
    pub error_message: Option<String>,
    pub pipeline_error: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub approved_by: Option<String>,
    pub pipeline_started_at: Option<Timestamp>,
    pub pipeline_completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GeneratedAsset {
    /// Lifecycle status. Unknown ids (never seeded) read as `Failed`.
    pub fn status(&self) -> AssetStatus {
        AssetStatus::from_id(self.status_id).unwrap_or(AssetStatus::Failed)
    }

    pub fn pipeline_status(&self) -> Option<PipelineStatus> {
        self.pipeline_status_id.and_then(PipelineStatus::from_id)
    }

    pub fn category(&self) -> Result<AssetCategory, CoreError> {
        AssetCategory::from_name(&self.category)
    }

    /// Key the post-approval pipeline reads the untouched original from.
    pub fn source_key(&self) -> Option<&str> {
        self.original_key
            .as_deref()
            .or(self.private_key.as_deref())
    }
}

/// DTO for inserting a new version. The variant number is assigned by the
/// store as `max(variant) + 1` for the (category, asset_key).
#[derive(Debug, Clone)]
pub struct CreateGeneratedAsset {
    pub category: String,
    pub asset_key: String,
    pub sprite_variant: Option<String>,
    pub parent_asset_id: Option<DbId>,
    pub base_prompt: String,
    pub current_prompt: String,
    pub prompt_version: i32,
    pub rejection_count: i32,
    pub generation_settings: serde_json::Value,
    pub generation_model: Option<String>,
    pub references: Vec<ReferenceSpec>,
}

impl CreateGeneratedAsset {
    /// A fresh first-prompt version with no lineage.
    pub fn new(category: AssetCategory, asset_key: &str, prompt: String) -> Self {
        Self {
            category: category.name().to_string(),
            asset_key: asset_key.to_string(),
            sprite_variant: None,
            parent_asset_id: None,
            current_prompt: prompt.clone(),
            base_prompt: prompt,
            prompt_version: 1,
            rejection_count: 0,
            generation_settings: serde_json::Value::Object(Default::default()),
            generation_model: None,
            references: Vec::new(),
        }
    }
}

/// Query filter for listing versions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetQuery {
    pub category: Option<String>,
    pub asset_key: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
