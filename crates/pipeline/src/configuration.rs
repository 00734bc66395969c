//! Live-game configuration: which approved version of a logical key is
//! wired into the game, and whether that configuration is published.
//!
//! Approval ("this image is good") and publishing ("this configuration is
//! live") are independent gates.

use assetforge_core::category::{validate_asset_key, AssetCategory};
use assetforge_core::types::DbId;
use assetforge_db::models::audit::CreateAuditEntry;
use assetforge_db::models::configuration::{AssetConfiguration, UpsertAssetConfiguration};
use assetforge_db::models::status::AssetStatus;
use serde::Deserialize;
use serde_json::json;

use crate::audit;
use crate::error::PipelineError;
use crate::services::Services;

/// Optional numeric overrides stored with a selection. `None` keeps the
/// current value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SpriteOverrides {
    pub cost_override: Option<f64>,
    pub scale_override: Option<f64>,
}

pub struct ConfigurationService {
    services: Services,
}

impl ConfigurationService {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub async fn find(
        &self,
        category: &str,
        asset_key: &str,
    ) -> Result<AssetConfiguration, PipelineError> {
        self.services
            .store
            .find_configuration(category, asset_key)
            .await?
            .ok_or_else(|| not_found(category, asset_key))
    }

    /// Select an approved version of `(category, asset_key)` as the live
    /// sprite.
    pub async fn select_sprite(
        &self,
        category: &str,
        asset_key: &str,
        asset_id: DbId,
        overrides: SpriteOverrides,
        actor: &str,
    ) -> Result<AssetConfiguration, PipelineError> {
        AssetCategory::from_name(category)?;
        validate_asset_key(asset_key)?;

        let store = &self.services.store;
        let asset = store
            .find_asset(asset_id)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset_id))?;
        if asset.category != category || asset.asset_key != asset_key {
            return Err(PipelineError::Validation(format!(
                "Asset {asset_id} belongs to {}/{}, not {category}/{asset_key}",
                asset.category, asset.asset_key
            )));
        }
        if asset.status() != AssetStatus::Approved {
            return Err(PipelineError::Validation(format!(
                "Asset {asset_id} is '{}'; only approved versions can be selected",
                asset.status()
            )));
        }

        let input = UpsertAssetConfiguration {
            active_sprite_id: asset_id,
            cost_override: overrides.cost_override,
            scale_override: overrides.scale_override,
        };
        let config = store
            .upsert_configuration(category, asset_key, &input)
            .await?;

        tracing::info!(category, asset_key, asset_id, actor, "Sprite selected");
        audit::record_asset(
            store.as_ref(),
            actor,
            "select_sprite",
            asset_id,
            json!({
                "category": category,
                "asset_key": asset_key,
                "cost_override": overrides.cost_override,
                "scale_override": overrides.scale_override,
            }),
        )
        .await;
        Ok(config)
    }

    /// Make a configuration live. Requires a selected sprite that has been
    /// published by the pipeline.
    pub async fn publish(
        &self,
        category: &str,
        asset_key: &str,
        actor: &str,
    ) -> Result<AssetConfiguration, PipelineError> {
        let config = self.find(category, asset_key).await?;
        let sprite_id = config.active_sprite_id.ok_or_else(|| {
            PipelineError::Validation(format!("No sprite selected for {category}/{asset_key}"))
        })?;

        let store = &self.services.store;
        let sprite = store
            .find_asset(sprite_id)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(sprite_id))?;
        if sprite.public_url.is_none() {
            return Err(PipelineError::Validation(format!(
                "Selected sprite {sprite_id} has no published image yet"
            )));
        }

        self.set_published(category, asset_key, true, actor).await
    }

    pub async fn unpublish(
        &self,
        category: &str,
        asset_key: &str,
        actor: &str,
    ) -> Result<AssetConfiguration, PipelineError> {
        self.set_published(category, asset_key, false, actor).await
    }

    async fn set_published(
        &self,
        category: &str,
        asset_key: &str,
        published: bool,
        actor: &str,
    ) -> Result<AssetConfiguration, PipelineError> {
        let store = &self.services.store;
        let config = store
            .set_configuration_published(category, asset_key, published)
            .await?
            .ok_or_else(|| not_found(category, asset_key))?;

        tracing::info!(
            category,
            asset_key,
            published,
            actor,
            "Configuration publish flag set"
        );
        audit::record(
            store.as_ref(),
            CreateAuditEntry {
                actor: actor.to_string(),
                action: if published { "publish" } else { "unpublish" }.to_string(),
                entity_type: "asset_configuration".to_string(),
                entity_id: Some(config.id),
                details: json!({ "category": category, "asset_key": asset_key }),
            },
        )
        .await;
        Ok(config)
    }
}

fn not_found(category: &str, asset_key: &str) -> PipelineError {
    PipelineError::NotFound {
        entity: "asset_configuration",
        id: format!("{category}/{asset_key}"),
    }
}
