//! Cached composite images (avatar stacks, scenes).

use assetforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `composite_cache` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CompositeCacheEntry {
    pub id: DbId,
    pub kind: String,
    pub owner_key: String,
    /// Empty for avatars; the scene template key for scenes.
    pub scope_key: String,
    pub content_hash: String,
    pub storage_key: String,
    pub public_url: String,
    pub last_accessed_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting or replacing a cache slot.
#[derive(Debug, Clone)]
pub struct UpsertCompositeCacheEntry {
    pub kind: String,
    pub owner_key: String,
    pub scope_key: String,
    pub content_hash: String,
    pub storage_key: String,
    pub public_url: String,
}
