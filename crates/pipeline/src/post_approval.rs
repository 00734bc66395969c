//! Post-Approval Pipeline: background removal, trim, resize and publish.
//!
//! A run starts with an atomic claim (`pipeline_status = processing` unless
//! a run is already in flight) and always reads the untouched original, so
//! re-running after a failure or a crash produces the same published
//! object. Any error before completion marks the run `failed` with the
//! message in `pipeline_error`; the asset stays `approved`.

use assetforge_cloud::{StorageError, Tier};
use assetforge_core::category::AssetCategory;
use assetforge_core::sizing::target_dimensions;
use assetforge_core::storage_keys::{
    processed_key, resize_scratch_key, sprite_key, transparent_key, PublishFormat,
    PNG_CONTENT_TYPE,
};
use assetforge_core::trim::trim_transparent;
use assetforge_core::types::DbId;
use assetforge_db::models::generated_asset::GeneratedAsset;
use assetforge_db::models::status::AssetStatus;
use assetforge_events::AssetEvent;
use assetforge_imaging::OutputFormat;
use chrono::Utc;
use serde_json::json;

use crate::audit;
use crate::error::PipelineError;
use crate::services::Services;

const ACTOR: &str = "pipeline";

/// Result of a pipeline run that did not fail.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Published. `warning` carries a non-fatal resize failure.
    Completed {
        asset: GeneratedAsset,
        warning: Option<String>,
    },
    /// The run did not start: claim lost, wrong status or category.
    Skipped { reason: String },
}

/// Bytes ready to publish and the format they are in.
struct Rendered {
    bytes: Vec<u8>,
    format: PublishFormat,
    warning: Option<String>,
}

pub struct PostApprovalPipeline {
    services: Services,
}

impl PostApprovalPipeline {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Run the pipeline for one approved sprite.
    pub async fn run(&self, asset_id: DbId) -> Result<PipelineOutcome, PipelineError> {
        let store = &self.services.store;
        let asset = store
            .find_asset(asset_id)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset_id))?;

        let category = asset.category()?;
        if !category.is_sprite() {
            return Ok(self.skip(asset_id, format!("category '{category}' is not a sprite")));
        }
        if asset.status() != AssetStatus::Approved {
            return Ok(self.skip(
                asset_id,
                format!("status is '{}', not approved", asset.status()),
            ));
        }

        let Some(claimed) = store.claim_pipeline(asset_id).await? else {
            return Ok(self.skip(asset_id, "a run is already in progress".to_string()));
        };
        tracing::info!(
            asset_id,
            category = %claimed.category,
            asset_key = %claimed.asset_key,
            variant = claimed.variant,
            "Pipeline started"
        );
        self.services
            .events
            .publish(AssetEvent::PipelineStarted { asset_id });

        match self.process(&claimed, category).await {
            Ok((asset, warning)) => {
                let public_url = asset.public_url.clone().unwrap_or_default();
                tracing::info!(asset_id, public_url = %public_url, "Pipeline completed");
                self.services.events.publish(AssetEvent::PipelineCompleted {
                    asset_id,
                    public_url: public_url.clone(),
                    warning: warning.clone(),
                });
                audit::record_asset(
                    store.as_ref(),
                    ACTOR,
                    "pipeline_completed",
                    asset_id,
                    json!({ "public_url": public_url, "warning": warning }),
                )
                .await;
                Ok(PipelineOutcome::Completed { asset, warning })
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(asset_id, error = %message, "Pipeline failed");
                if let Err(store_err) = store.fail_pipeline(asset_id, &message).await {
                    tracing::error!(
                        asset_id,
                        error = %store_err,
                        "Failed to record pipeline failure"
                    );
                }
                self.services.events.publish(AssetEvent::PipelineFailed {
                    asset_id,
                    error: message.clone(),
                });
                audit::record_asset(
                    store.as_ref(),
                    ACTOR,
                    "pipeline_failed",
                    asset_id,
                    json!({ "error": message }),
                )
                .await;
                Err(e)
            }
        }
    }

    fn skip(&self, asset_id: DbId, reason: String) -> PipelineOutcome {
        tracing::info!(asset_id, reason = %reason, "Pipeline skipped");
        self.services.events.publish(AssetEvent::PipelineSkipped {
            asset_id,
            reason: reason.clone(),
        });
        PipelineOutcome::Skipped { reason }
    }

    async fn process(
        &self,
        asset: &GeneratedAsset,
        category: AssetCategory,
    ) -> Result<(GeneratedAsset, Option<String>), PipelineError> {
        let store = &self.services.store;
        let objects = &self.services.objects;
        let config = &self.services.config;

        // 1. Original.
        let source_key = asset
            .source_key()
            .ok_or_else(|| PipelineError::OriginalNotFound {
                key: "<none>".into(),
            })?
            .to_string();
        let original = objects
            .get(Tier::Private, &source_key)
            .await
            .map_err(|e| match e {
                StorageError::NotFound { key, .. } => PipelineError::OriginalNotFound { key },
                other => other.into(),
            })?;

        // 2. Background removal.
        let cut_out = if asset.asset_key == config.ground_texture_key {
            tracing::debug!(asset_id = asset.id, "Ground texture, background kept");
            original
        } else {
            self.services
                .remover
                .remove_background(original, config.delegate_trim)
                .await?
        };

        // 3. Trim.
        let trimmed = trim_transparent(&cut_out)?;
        tracing::debug!(
            asset_id = asset.id,
            width = trimmed.width,
            height = trimmed.height,
            trimmed = trimmed.trimmed,
            "Trimmed transparent border"
        );

        // 4. Persist the processed image privately.
        let processed = processed_key(
            category,
            &asset.asset_key,
            asset.variant,
            Utc::now().timestamp(),
        );
        let transparent = transparent_key(&source_key);
        objects
            .put(Tier::Private, &processed, trimmed.png.clone(), PNG_CONTENT_TYPE)
            .await?;
        objects
            .put(Tier::Private, &transparent, trimmed.png.clone(), PNG_CONTENT_TYPE)
            .await?;
        store
            .record_processed(asset.id, &transparent, &processed)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset.id))?;

        // 5. Resize and convert. Failure here is recorded but not fatal.
        let rendered = self.render(asset, category, trimmed.png).await;
        if let Some(warning) = &rendered.warning {
            store
                .record_pipeline_warning(asset.id, warning)
                .await?
                .ok_or_else(|| PipelineError::asset_not_found(asset.id))?;
        }

        // 6. Publish.
        let public_key = sprite_key(category, &asset.asset_key, asset.variant, rendered.format);
        objects
            .put(
                Tier::Public,
                &public_key,
                rendered.bytes,
                rendered.format.content_type(),
            )
            .await?;
        let stale_format = match rendered.format {
            PublishFormat::Webp => PublishFormat::Png,
            PublishFormat::Png => PublishFormat::Webp,
        };
        objects
            .delete(
                Tier::Public,
                &sprite_key(category, &asset.asset_key, asset.variant, stale_format),
            )
            .await?;
        let public_url = objects.public_url(&public_key);
        store
            .publish_asset(asset.id, &public_key, &public_url)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset.id))?;

        // 7. Done.
        let completed = store
            .complete_pipeline(asset.id)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset.id))?;
        Ok((completed, rendered.warning))
    }

    /// Resize through the URL-fetching resize service.
    ///
    /// The trimmed image is written to a public scratch key for the service
    /// to fetch and deleted afterwards on every path. Categories without a
    /// size entry are published as PNG unchanged.
    async fn render(
        &self,
        asset: &GeneratedAsset,
        category: AssetCategory,
        png: Vec<u8>,
    ) -> Rendered {
        let Some(size) = target_dimensions(category, &asset.asset_key) else {
            return Rendered {
                bytes: png,
                format: PublishFormat::Png,
                warning: None,
            };
        };

        let objects = &self.services.objects;
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let scratch = resize_scratch_key(category, &asset.asset_key, asset.variant, &nonce);

        let result = match objects
            .put(Tier::Public, &scratch, png.clone(), PNG_CONTENT_TYPE)
            .await
        {
            Ok(()) => {
                let url = objects.public_url(&scratch);
                let resized = self
                    .services
                    .resizer
                    .resize_from_url(&url, size.width, size.height, OutputFormat::Webp)
                    .await
                    .map_err(|e| e.to_string());
                if let Err(e) = objects.delete(Tier::Public, &scratch).await {
                    tracing::warn!(
                        asset_id = asset.id,
                        key = %scratch,
                        error = %e,
                        "Failed to delete resize scratch object"
                    );
                }
                resized
            }
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(bytes) => Rendered {
                bytes,
                format: PublishFormat::Webp,
                warning: None,
            },
            Err(message) => {
                tracing::warn!(
                    asset_id = asset.id,
                    error = %message,
                    "Resize failed, publishing unresized PNG"
                );
                Rendered {
                    bytes: png,
                    format: PublishFormat::Png,
                    warning: Some(format!("Resize failed: {message}")),
                }
            }
        }
    }
}
