//! Repository for the `asset_configurations` table.

use sqlx::PgPool;

use crate::models::configuration::{AssetConfiguration, UpsertAssetConfiguration};

const COLUMNS: &str = "id, category, asset_key, active_sprite_id, cost_override, \
    scale_override, is_published, published_at, created_at, updated_at";

/// Provides selection and publish-gate operations for asset configurations.
pub struct AssetConfigurationRepo;

impl AssetConfigurationRepo {
    pub async fn find(
        pool: &PgPool,
        category: &str,
        asset_key: &str,
    ) -> Result<Option<AssetConfiguration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM asset_configurations WHERE category = $1 AND asset_key = $2"
        );
        sqlx::query_as::<_, AssetConfiguration>(&query)
            .bind(category)
            .bind(asset_key)
            .fetch_optional(pool)
            .await
    }

    /// Select the active sprite for a logical key, creating the row on first use.
    /// `None` overrides keep the stored values.
    pub async fn upsert(
        pool: &PgPool,
        category: &str,
        asset_key: &str,
        input: &UpsertAssetConfiguration,
    ) -> Result<AssetConfiguration, sqlx::Error> {
        let query = format!(
            "INSERT INTO asset_configurations
                (category, asset_key, active_sprite_id, cost_override, scale_override)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (category, asset_key) DO UPDATE SET
                active_sprite_id = EXCLUDED.active_sprite_id,
                cost_override = COALESCE(EXCLUDED.cost_override, asset_configurations.cost_override),
                scale_override = COALESCE(EXCLUDED.scale_override, asset_configurations.scale_override)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssetConfiguration>(&query)
            .bind(category)
            .bind(asset_key)
            .bind(input.active_sprite_id)
            .bind(input.cost_override)
            .bind(input.scale_override)
            .fetch_one(pool)
            .await
    }

    /// Flip the publish gate. Returns `None` if no configuration exists.
    pub async fn set_published(
        pool: &PgPool,
        category: &str,
        asset_key: &str,
        published: bool,
    ) -> Result<Option<AssetConfiguration>, sqlx::Error> {
        let query = format!(
            "UPDATE asset_configurations SET
                is_published = $3,
                published_at = CASE WHEN $3 THEN NOW() ELSE NULL END
             WHERE category = $1 AND asset_key = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssetConfiguration>(&query)
            .bind(category)
            .bind(asset_key)
            .bind(published)
            .fetch_optional(pool)
            .await
    }
}
