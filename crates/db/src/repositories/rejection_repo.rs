//! Repository for the append-only `asset_rejections` table.

use assetforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::generated_asset::GeneratedAsset;
use crate::models::rejection::{AssetRejection, CreateAssetRejection};
use crate::models::status::AssetStatus;

const COLUMNS: &str =
    "id, asset_id, reason, prompt_snapshot, storage_key_snapshot, actor, created_at";

/// Provides append and list operations for rejection history.
pub struct AssetRejectionRepo;

impl AssetRejectionRepo {
    /// Append a rejection snapshot and mark the asset `rejected` in one
    /// transaction.
    ///
    /// The rejected row loses its active flag. When `feedback_prompt` is set
    /// it replaces `current_prompt` and bumps `prompt_version`;
    /// `rejection_count` is always incremented.
    pub async fn reject(
        pool: &PgPool,
        input: &CreateAssetRejection,
        feedback_prompt: Option<&str>,
    ) -> Result<Option<(GeneratedAsset, AssetRejection)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO asset_rejections (asset_id, reason, prompt_snapshot, storage_key_snapshot, actor)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let rejection = sqlx::query_as::<_, AssetRejection>(&query)
            .bind(input.asset_id)
            .bind(&input.reason)
            .bind(&input.prompt_snapshot)
            .bind(&input.storage_key_snapshot)
            .bind(&input.actor)
            .fetch_one(&mut *tx)
            .await?;

        let asset = sqlx::query_as::<_, GeneratedAsset>(&format!(
            "UPDATE generated_assets SET
                status_id = $2,
                is_active = false,
                rejection_count = rejection_count + 1,
                current_prompt = COALESCE($3, current_prompt),
                prompt_version = prompt_version + CASE WHEN $3::TEXT IS NULL THEN 0 ELSE 1 END
             WHERE id = $1
             RETURNING {}",
            super::generated_asset_repo::columns()
        ))
        .bind(input.asset_id)
        .bind(AssetStatus::Rejected.id())
        .bind(feedback_prompt)
        .fetch_optional(&mut *tx)
        .await?;

        match asset {
            Some(asset) => {
                tx.commit().await?;
                Ok(Some((asset, rejection)))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    /// Rejection history for an asset, oldest first.
    pub async fn list_by_asset(
        pool: &PgPool,
        asset_id: DbId,
    ) -> Result<Vec<AssetRejection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM asset_rejections WHERE asset_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, AssetRejection>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }
}
