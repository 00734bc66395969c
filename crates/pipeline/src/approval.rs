//! Versioning & Approval Engine.
//!
//! Status transitions driven by a human reviewer:
//!
//! | Operation      | Legal from                         | Result                        |
//! |----------------|------------------------------------|-------------------------------|
//! | `approve`      | `completed`, `review`              | `approved`, active            |
//! | `reject`       | `completed`, `review`, `approved`  | `rejected`, inactive          |
//! | `set_active`   | `approved`                         | active                        |
//! | `regenerate`   | anything but `pending`/`generating`| new version at `max + 1`      |
//! | `archive`      | anything but `generating`          | `archived`, inactive          |
//!
//! Activation always deactivates every sibling of the (category, asset_key)
//! first, inside one transaction.

use std::sync::Arc;

use assetforge_core::category::AssetCategory;
use assetforge_core::lineage::dependent_sprites;
use assetforge_core::prompt::with_feedback;
use assetforge_core::references::ReferenceSpec;
use assetforge_core::types::DbId;
use assetforge_db::models::generated_asset::{CreateGeneratedAsset, GeneratedAsset};
use assetforge_db::models::rejection::{AssetRejection, CreateAssetRejection};
use assetforge_db::models::status::{AssetStatus, QueueStatus};
use assetforge_events::AssetEvent;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::audit;
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;
use crate::queue::PipelineQueue;
use crate::references;
use crate::services::Services;

/// Whether approval queued a post-approval pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineTrigger {
    Started,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub asset: GeneratedAsset,
    pub pipeline: PipelineTrigger,
    /// Dependent sprite rows created by approving a reference sheet.
    pub dependents_enqueued: Vec<GeneratedAsset>,
}

/// Optional changes for a regenerated version. Unset fields are inherited
/// from the source row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegenerateOverrides {
    pub prompt: Option<String>,
    /// Merged key by key over the source settings.
    pub settings: Option<Value>,
    /// Replaces the source references entirely.
    pub references: Option<Vec<ReferenceSpec>>,
}

pub struct ApprovalEngine {
    services: Services,
    orchestrator: Arc<Orchestrator>,
    queue: PipelineQueue,
}

impl ApprovalEngine {
    pub fn new(services: Services, orchestrator: Arc<Orchestrator>, queue: PipelineQueue) -> Self {
        Self {
            services,
            orchestrator,
            queue,
        }
    }

    async fn load(&self, asset_id: DbId) -> Result<GeneratedAsset, PipelineError> {
        self.services
            .store
            .find_asset(asset_id)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset_id))
    }

    /// Approve and activate a version.
    ///
    /// Sprites that were never processed get a pipeline run queued.
    /// Reference sheets get one `pending` row per implied dependent sprite
    /// that does not exist yet.
    pub async fn approve(
        &self,
        asset_id: DbId,
        actor: &str,
    ) -> Result<ApprovalOutcome, PipelineError> {
        let current = self.load(asset_id).await?;
        let status = current.status();
        if !status.is_approvable() {
            return Err(invalid(status, "approve"));
        }

        let store = &self.services.store;
        let approved = store
            .approve_and_activate(asset_id, actor)
            .await?
            .ok_or_else(|| invalid(status, "approve"))?;
        let category = approved.category()?;
        tracing::info!(
            asset_id,
            category = %approved.category,
            asset_key = %approved.asset_key,
            variant = approved.variant,
            actor,
            "Asset approved"
        );
        self.services.events.publish(AssetEvent::Approved {
            asset_id,
            actor: actor.to_string(),
        });

        let pipeline = if category.is_sprite() && !approved.background_removed {
            self.queue.enqueue(asset_id).await?;
            PipelineTrigger::Started
        } else {
            PipelineTrigger::Skipped
        };

        let dependents = if category.is_reference() {
            self.enqueue_dependents(&approved, category).await?
        } else {
            Vec::new()
        };

        audit::record_asset(
            store.as_ref(),
            actor,
            "approve",
            asset_id,
            json!({
                "previous_status": status.name(),
                "pipeline": pipeline,
                "dependents_enqueued": dependents.iter().map(|d| d.id).collect::<Vec<_>>(),
            }),
        )
        .await;

        Ok(ApprovalOutcome {
            asset: approved,
            pipeline,
            dependents_enqueued: dependents,
        })
    }

    async fn enqueue_dependents(
        &self,
        sheet: &GeneratedAsset,
        category: AssetCategory,
    ) -> Result<Vec<GeneratedAsset>, PipelineError> {
        let store = &self.services.store;
        let mut created = Vec::new();

        for dependent in dependent_sprites(category, &sheet.asset_key) {
            let prompt = match self
                .services
                .prompts
                .resolve(dependent.category, &dependent.asset_key)
            {
                Ok(prompt) => prompt,
                Err(e) => {
                    tracing::warn!(
                        sheet_id = sheet.id,
                        error = %e,
                        "Dependent sprite not enqueued"
                    );
                    continue;
                }
            };

            let mut input =
                CreateGeneratedAsset::new(dependent.category, &dependent.asset_key, prompt);
            input.sprite_variant = dependent.sprite_variant;
            input.parent_asset_id = Some(sheet.id);

            if let Some(row) = store.create_asset_if_absent(&input).await? {
                store
                    .enqueue_generation(row.id, QueueStatus::Pending)
                    .await?;
                tracing::info!(
                    sheet_id = sheet.id,
                    asset_id = row.id,
                    asset_key = %row.asset_key,
                    "Dependent sprite enqueued"
                );
                created.push(row);
            }
        }

        Ok(created)
    }

    /// Reject a version with a non-empty reason.
    ///
    /// With `incorporate_feedback`, the prompt becomes the base prompt plus
    /// a block quoting `reason`, and `prompt_version` is bumped.
    pub async fn reject(
        &self,
        asset_id: DbId,
        reason: &str,
        incorporate_feedback: bool,
        actor: &str,
    ) -> Result<(GeneratedAsset, AssetRejection), PipelineError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PipelineError::Validation(
                "A rejection reason is required".into(),
            ));
        }

        let current = self.load(asset_id).await?;
        let status = current.status();
        if !status.is_rejectable() {
            return Err(invalid(status, "reject"));
        }

        let feedback_prompt =
            incorporate_feedback.then(|| with_feedback(&current.base_prompt, reason));
        let input = CreateAssetRejection {
            asset_id,
            reason: reason.to_string(),
            prompt_snapshot: current.current_prompt.clone(),
            storage_key_snapshot: current.private_key.clone(),
            actor: actor.to_string(),
        };

        let store = &self.services.store;
        let (asset, rejection) = store
            .reject_asset(&input, feedback_prompt.as_deref())
            .await?
            .ok_or_else(|| invalid(status, "reject"))?;

        tracing::info!(
            asset_id,
            actor,
            rejection_count = asset.rejection_count,
            "Asset rejected"
        );
        self.services.events.publish(AssetEvent::Rejected {
            asset_id,
            actor: actor.to_string(),
        });
        audit::record_asset(
            store.as_ref(),
            actor,
            "reject",
            asset_id,
            json!({
                "reason": reason,
                "previous_status": status.name(),
                "feedback_incorporated": incorporate_feedback,
                "prompt_version": asset.prompt_version,
            }),
        )
        .await;

        Ok((asset, rejection))
    }

    /// Spawn a new version from `asset_id` and generate it.
    ///
    /// Once the new version completes, a `review` source is moved to
    /// `completed` for side-by-side comparison. Any other source status is
    /// left untouched, and a failed generation marks only the new row.
    pub async fn regenerate(
        &self,
        asset_id: DbId,
        overrides: RegenerateOverrides,
        actor: &str,
    ) -> Result<GeneratedAsset, PipelineError> {
        let source = self.load(asset_id).await?;
        let status = source.status();
        if matches!(status, AssetStatus::Pending | AssetStatus::Generating) {
            return Err(invalid(status, "regenerate"));
        }

        let category = source.category()?;
        let settings = merge_settings(&source.generation_settings, overrides.settings)?;
        let specs = overrides
            .references
            .unwrap_or_else(|| source.references.0.clone());
        let (prompt, prompt_version) = match overrides
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            Some(prompt) => (prompt.to_string(), source.prompt_version + 1),
            None => (source.current_prompt.clone(), source.prompt_version),
        };

        let assembled =
            references::assemble(&self.services, category, &source.asset_key, &specs).await?;

        let input = CreateGeneratedAsset {
            category: source.category.clone(),
            asset_key: source.asset_key.clone(),
            sprite_variant: source.sprite_variant.clone(),
            parent_asset_id: source
                .parent_asset_id
                .or_else(|| assembled.parent.as_ref().map(|p| p.id)),
            base_prompt: source.base_prompt.clone(),
            current_prompt: prompt,
            prompt_version,
            rejection_count: source.rejection_count,
            generation_settings: settings,
            generation_model: None,
            references: specs,
        };

        tracing::info!(source_id = asset_id, actor, "Regenerating asset");
        let regenerated = self.orchestrator.launch(input, assembled, actor).await?;

        if status == AssetStatus::Review && regenerated.status() == AssetStatus::Completed {
            let store = &self.services.store;
            store
                .set_asset_status(asset_id, AssetStatus::Completed)
                .await?;
            audit::record_asset(
                store.as_ref(),
                actor,
                "superseded_for_review",
                asset_id,
                json!({
                    "previous_status": status.name(),
                    "new_status": AssetStatus::Completed.name(),
                    "regenerated_asset_id": regenerated.id,
                }),
            )
            .await;
        }
        Ok(regenerated)
    }

    /// Make an approved version the active one.
    pub async fn set_active(
        &self,
        asset_id: DbId,
        actor: &str,
    ) -> Result<GeneratedAsset, PipelineError> {
        let current = self.load(asset_id).await?;
        let status = current.status();
        if status != AssetStatus::Approved {
            return Err(invalid(status, "activate"));
        }

        let store = &self.services.store;
        let active = store
            .activate(asset_id)
            .await?
            .ok_or_else(|| invalid(status, "activate"))?;

        tracing::info!(asset_id, variant = active.variant, actor, "Asset activated");
        self.services
            .events
            .publish(AssetEvent::Activated { asset_id });
        audit::record_asset(
            store.as_ref(),
            actor,
            "activate",
            asset_id,
            json!({ "variant": active.variant }),
        )
        .await;
        Ok(active)
    }

    /// Soft-hide a version. Rows are never deleted.
    pub async fn archive(
        &self,
        asset_id: DbId,
        actor: &str,
    ) -> Result<GeneratedAsset, PipelineError> {
        let current = self.load(asset_id).await?;
        let status = current.status();
        if status == AssetStatus::Generating {
            return Err(invalid(status, "archive"));
        }

        let store = &self.services.store;
        let archived = store
            .archive_asset(asset_id)
            .await?
            .ok_or_else(|| PipelineError::asset_not_found(asset_id))?;
        audit::record_asset(
            store.as_ref(),
            actor,
            "archive",
            asset_id,
            json!({ "previous_status": status.name() }),
        )
        .await;
        Ok(archived)
    }

    /// Queue a pipeline run for an approved sprite, regardless of earlier
    /// runs.
    pub async fn rerun_pipeline(
        &self,
        asset_id: DbId,
        actor: &str,
    ) -> Result<PipelineTrigger, PipelineError> {
        let current = self.load(asset_id).await?;
        let status = current.status();
        if status != AssetStatus::Approved {
            return Err(invalid(status, "run the pipeline for"));
        }
        let category = current.category()?;
        if !category.is_sprite() {
            return Err(PipelineError::Validation(format!(
                "Category '{category}' does not go through the pipeline"
            )));
        }

        self.queue.enqueue(asset_id).await?;
        audit::record_asset(
            self.services.store.as_ref(),
            actor,
            "rerun_pipeline",
            asset_id,
            json!({}),
        )
        .await;
        Ok(PipelineTrigger::Started)
    }

    pub async fn list_rejections(
        &self,
        asset_id: DbId,
    ) -> Result<Vec<AssetRejection>, PipelineError> {
        self.load(asset_id).await?;
        Ok(self.services.store.list_rejections(asset_id).await?)
    }

    pub async fn list_versions(
        &self,
        category: &str,
        asset_key: &str,
    ) -> Result<Vec<GeneratedAsset>, PipelineError> {
        AssetCategory::from_name(category)?;
        Ok(self.services.store.list_versions(category, asset_key).await?)
    }
}

fn invalid(from: AssetStatus, action: &'static str) -> PipelineError {
    PipelineError::InvalidTransition {
        from: from.name().to_string(),
        action,
    }
}

/// Merge `overrides` over `base` key by key; overrides win.
fn merge_settings(base: &Value, overrides: Option<Value>) -> Result<Value, PipelineError> {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    match overrides {
        None | Some(Value::Null) => {}
        Some(Value::Object(changes)) => merged.extend(changes),
        Some(_) => {
            return Err(PipelineError::Validation(
                "settings overrides must be a JSON object".into(),
            ))
        }
    }
    Ok(Value::Object(merged))
}
