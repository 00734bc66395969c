//! Generation Orchestrator.
//!
//! `generate` validates the request, runs the dependency gate and loads the
//! reference images before anything is written. Only then is a `pending`
//! row inserted at the next variant, a queue entry recorded, and the remote
//! generation call made. A remote failure is terminal for that row.

use assetforge_cloud::Tier;
use assetforge_core::category::{validate_asset_key, AssetCategory};
use assetforge_core::references::ReferenceSpec;
use assetforge_core::storage_keys::{raw_key, PNG_CONTENT_TYPE};
use assetforge_core::types::DbId;
use assetforge_db::models::generated_asset::{CreateGeneratedAsset, GeneratedAsset};
use assetforge_db::models::status::{AssetStatus, QueueStatus};
use assetforge_events::AssetEvent;
use assetforge_imaging::{GenerationRequest, RemoteError};
use serde::Deserialize;
use serde_json::json;

use crate::audit;
use crate::error::PipelineError;
use crate::references::{self, Assembled};
use crate::services::Services;

/// Input to [`Orchestrator::generate`].
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub category: String,
    pub asset_key: String,
    /// Used verbatim instead of the template library when present.
    #[serde(default)]
    pub prompt_override: Option<String>,
    #[serde(default)]
    pub references: Vec<ReferenceSpec>,
    /// Model parameters, recorded on the row verbatim.
    #[serde(default = "empty_settings")]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub sprite_variant: Option<String>,
}

fn empty_settings() -> serde_json::Value {
    json!({})
}

impl GenerateRequest {
    pub fn new(category: AssetCategory, asset_key: impl Into<String>) -> Self {
        Self {
            category: category.name().to_string(),
            asset_key: asset_key.into(),
            prompt_override: None,
            references: Vec::new(),
            settings: empty_settings(),
            sprite_variant: None,
        }
    }
}

pub struct Orchestrator {
    services: Services,
}

impl Orchestrator {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Create a new version of `(category, asset_key)` and generate it.
    ///
    /// Returns the row after the attempt: `completed` on success, `failed`
    /// with `error_message` set when the remote call failed.
    pub async fn generate(
        &self,
        request: GenerateRequest,
        actor: &str,
    ) -> Result<GeneratedAsset, PipelineError> {
        let category = AssetCategory::from_name(&request.category)?;
        validate_asset_key(&request.asset_key)?;
        if !request.settings.is_object() {
            return Err(PipelineError::Validation(
                "settings must be a JSON object".into(),
            ));
        }

        let prompt = match request
            .prompt_override
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            Some(prompt) => prompt.to_string(),
            None => self
                .services
                .prompts
                .resolve(category, &request.asset_key)?,
        };

        let assembled =
            references::assemble(&self.services, category, &request.asset_key, &request.references)
                .await?;

        let mut input = CreateGeneratedAsset::new(category, &request.asset_key, prompt);
        input.sprite_variant = request.sprite_variant;
        input.parent_asset_id = assembled.parent.as_ref().map(|p| p.id);
        input.generation_settings = request.settings;
        input.references = request.references;

        self.launch(input, assembled, actor).await
    }

    /// Insert a prepared version, record its queue entry and generate it.
    pub(crate) async fn launch(
        &self,
        input: CreateGeneratedAsset,
        assembled: Assembled,
        actor: &str,
    ) -> Result<GeneratedAsset, PipelineError> {
        let store = &self.services.store;
        let asset = store.create_asset(&input).await?;
        tracing::info!(
            asset_id = asset.id,
            category = %asset.category,
            asset_key = %asset.asset_key,
            variant = asset.variant,
            "Generation requested"
        );
        audit::record_asset(
            store.as_ref(),
            actor,
            "generate",
            asset.id,
            json!({
                "category": asset.category,
                "asset_key": asset.asset_key,
                "variant": asset.variant,
                "prompt_version": asset.prompt_version,
            }),
        )
        .await;

        let entry = store
            .enqueue_generation(asset.id, QueueStatus::Processing)
            .await?;
        self.execute(asset, assembled, Some(entry.id)).await
    }

    /// Generate an existing `pending` row, e.g. one auto-enqueued when its
    /// reference sheet was approved.
    ///
    /// A failed dependency gate marks the row `failed` with the gate message,
    /// since the row already exists.
    pub async fn run_generation(
        &self,
        asset_id: DbId,
        queue_entry_id: Option<DbId>,
    ) -> Result<GeneratedAsset, PipelineError> {
        let store = &self.services.store;
        let asset = store
            .find_asset(asset_id)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset_id))?;
        if asset.status() != AssetStatus::Pending {
            return Err(PipelineError::InvalidTransition {
                from: asset.status().name().to_string(),
                action: "generate",
            });
        }

        let category = asset.category()?;
        match references::assemble(
            &self.services,
            category,
            &asset.asset_key,
            &asset.references.0,
        )
        .await
        {
            Ok(assembled) => self.execute(asset, assembled, queue_entry_id).await,
            Err(e) => {
                tracing::warn!(asset_id, error = %e, "Generation prerequisites not met");
                self.record_failure(&asset, queue_entry_id, &e.to_string()).await
            }
        }
    }

    async fn execute(
        &self,
        asset: GeneratedAsset,
        assembled: Assembled,
        queue_entry_id: Option<DbId>,
    ) -> Result<GeneratedAsset, PipelineError> {
        let store = &self.services.store;
        let generating = store.mark_generating(asset.id).await?.ok_or_else(|| {
            PipelineError::InvalidTransition {
                from: asset.status().name().to_string(),
                action: "generate",
            }
        })?;

        let request = GenerationRequest {
            prompt: generating.current_prompt.clone(),
            references: assembled.images,
            settings: generating.generation_settings.clone(),
        };
        tracing::debug!(
            asset_id = generating.id,
            references = request.references.len(),
            "Calling generation service"
        );

        match self.store_output(&generating, &request).await {
            Ok(key) => {
                let model = self.services.generator.model_name().to_string();
                let completed = store
                    .complete_generation(generating.id, &key, Some(&model))
                    .await?
                    .ok_or_else(|| PipelineError::asset_not_found(generating.id))?;
                if let Some(entry_id) = queue_entry_id {
                    store
                        .finish_generation(entry_id, QueueStatus::Completed, None)
                        .await?;
                }

                tracing::info!(
                    asset_id = completed.id,
                    variant = completed.variant,
                    storage_key = %key,
                    "Generation completed"
                );
                self.services.events.publish(AssetEvent::GenerationCompleted {
                    asset_id: completed.id,
                    category: completed.category.clone(),
                    asset_key: completed.asset_key.clone(),
                    variant: completed.variant,
                });
                audit::record_asset(
                    store.as_ref(),
                    "system",
                    "generation_completed",
                    completed.id,
                    json!({ "storage_key": key, "model": model }),
                )
                .await;
                Ok(completed)
            }
            Err(e) => {
                tracing::error!(asset_id = generating.id, error = %e, "Generation failed");
                self.record_failure(&generating, queue_entry_id, &e.to_string())
                    .await
            }
        }
    }

    /// Call the generator and write the first image to the private tier.
    async fn store_output(
        &self,
        asset: &GeneratedAsset,
        request: &GenerationRequest,
    ) -> Result<String, PipelineError> {
        let images = self.services.generator.generate(request).await?;
        let image = images
            .into_iter()
            .next()
            .ok_or(RemoteError::EmptyResponse)?;

        let key = raw_key(asset.category()?, &asset.asset_key, asset.variant);
        let content_type = if image.content_type.is_empty() {
            PNG_CONTENT_TYPE.to_string()
        } else {
            image.content_type
        };
        self.services
            .objects
            .put(Tier::Private, &key, image.bytes, &content_type)
            .await?;
        Ok(key)
    }

    async fn record_failure(
        &self,
        asset: &GeneratedAsset,
        queue_entry_id: Option<DbId>,
        message: &str,
    ) -> Result<GeneratedAsset, PipelineError> {
        let store = &self.services.store;
        let failed = store
            .fail_generation(asset.id, message)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset.id))?;
        if let Some(entry_id) = queue_entry_id {
            store
                .finish_generation(entry_id, QueueStatus::Failed, Some(message))
                .await?;
        }

        self.services.events.publish(AssetEvent::GenerationFailed {
            asset_id: failed.id,
            error: message.to_string(),
        });
        audit::record_asset(
            store.as_ref(),
            "system",
            "generation_failed",
            failed.id,
            json!({ "error": message }),
        )
        .await;
        Ok(failed)
    }
}
