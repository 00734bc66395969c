//! Append-only rejection history.

use assetforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `asset_rejections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssetRejection {
    pub id: DbId,
    pub asset_id: DbId,
    pub reason: String,
    pub prompt_snapshot: String,
    pub storage_key_snapshot: Option<String>,
    pub actor: String,
    pub created_at: Timestamp,
}

/// DTO for appending a rejection.
#[derive(Debug, Clone)]
pub struct CreateAssetRejection {
    pub asset_id: DbId,
    pub reason: String,
    pub prompt_snapshot: String,
    pub storage_key_snapshot: Option<String>,
    pub actor: String,
}
