//! Per-key live-game configuration: which approved version is wired in,
//! numeric overrides, and the publish gate.

use assetforge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `asset_configurations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssetConfiguration {
    pub id: DbId,
    pub category: String,
    pub asset_key: String,
    pub active_sprite_id: Option<DbId>,
    pub cost_override: Option<f64>,
    pub scale_override: Option<f64>,
    pub is_published: bool,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for selecting a sprite. `None` overrides keep the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertAssetConfiguration {
    pub active_sprite_id: DbId,
    pub cost_override: Option<f64>,
    pub scale_override: Option<f64>,
}
