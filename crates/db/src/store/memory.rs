//! In-memory [`AssetStore`](super::AssetStore).
//!
//! All tables live behind one `tokio::sync::Mutex`, so every method is a
//! single atomic step, matching the transactional behaviour of the
//! Postgres implementation.

use std::cmp::Reverse;

use assetforge_core::types::{DbId, Timestamp};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;

use super::{
    AssetRepository, AssetStore, AuditRepository, CompositeRepository, ConfigurationRepository,
    GenerationQueueRepository, PipelineStateRepository, StoreResult,
};
use crate::models::audit::{AuditEntry, AuditQuery, CreateAuditEntry};
use crate::models::composite::{CompositeCacheEntry, UpsertCompositeCacheEntry};
use crate::models::configuration::{AssetConfiguration, UpsertAssetConfiguration};
use crate::models::generated_asset::{AssetQuery, CreateGeneratedAsset, GeneratedAsset};
use crate::models::generation_queue::GenerationQueueEntry;
use crate::models::rejection::{AssetRejection, CreateAssetRejection};
use crate::models::status::{AssetStatus, PipelineStatus, QueueStatus};
use crate::repositories::audit_repo::MAX_AUDIT_LIMIT;

#[derive(Default)]
struct Tables {
    next_id: DbId,
    assets: Vec<GeneratedAsset>,
    rejections: Vec<AssetRejection>,
    queue: Vec<GenerationQueueEntry>,
    configurations: Vec<AssetConfiguration>,
    composites: Vec<CompositeCacheEntry>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn asset_mut(&mut self, id: DbId) -> Option<&mut GeneratedAsset> {
        self.assets.iter_mut().find(|a| a.id == id)
    }

    /// Apply `f` to the asset and return the updated row.
    fn update_asset(
        &mut self,
        id: DbId,
        f: impl FnOnce(&mut GeneratedAsset),
    ) -> Option<GeneratedAsset> {
        let asset = self.asset_mut(id)?;
        f(asset);
        asset.updated_at = Utc::now();
        Some(asset.clone())
    }

    fn insert_asset(&mut self, input: &CreateGeneratedAsset, variant: i32) -> GeneratedAsset {
        let now = Utc::now();
        let asset = GeneratedAsset {
            id: self.next_id(),
            category: input.category.clone(),
            asset_key: input.asset_key.clone(),
            variant,
            sprite_variant: input.sprite_variant.clone(),
            parent_asset_id: input.parent_asset_id,
            status_id: AssetStatus::Pending.id(),
            pipeline_status_id: None,
            is_active: false,
            background_removed: false,
            original_key: None,
            private_key: None,
            processed_key: None,
            public_key: None,
            public_url: None,
            base_prompt: input.base_prompt.clone(),
            current_prompt: input.current_prompt.clone(),
            prompt_version: input.prompt_version,
            rejection_count: input.rejection_count,
            generation_settings: input.generation_settings.clone(),
            generation_model: input.generation_model.clone(),
            references: Json(input.references.clone()),
            error_message: None,
            pipeline_error: None,
            approved_at: None,
            approved_by: None,
            pipeline_started_at: None,
            pipeline_completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.assets.push(asset.clone());
        asset
    }

    fn deactivate_siblings(&mut self, id: DbId) {
        let Some((category, asset_key)) = self
            .assets
            .iter()
            .find(|a| a.id == id)
            .map(|a| (a.category.clone(), a.asset_key.clone()))
        else {
            return;
        };
        for sibling in self.assets.iter_mut().filter(|a| {
            a.id != id && a.is_active && a.category == category && a.asset_key == asset_key
        }) {
            sibling.is_active = false;
            sibling.updated_at = Utc::now();
        }
    }
}

/// Process-local store for tests and single-node development runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetRepository for MemoryStore {
    async fn create_asset(&self, input: &CreateGeneratedAsset) -> StoreResult<GeneratedAsset> {
        let mut t = self.tables.lock().await;
        let variant = t
            .assets
            .iter()
            .filter(|a| a.category == input.category && a.asset_key == input.asset_key)
            .map(|a| a.variant)
            .max()
            .unwrap_or(0)
            + 1;
        Ok(t.insert_asset(input, variant))
    }

    async fn create_asset_if_absent(
        &self,
        input: &CreateGeneratedAsset,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        let exists = t
            .assets
            .iter()
            .any(|a| a.category == input.category && a.asset_key == input.asset_key);
        if exists {
            return Ok(None);
        }
        Ok(Some(t.insert_asset(input, 1)))
    }

    async fn find_asset(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        let t = self.tables.lock().await;
        Ok(t.assets.iter().find(|a| a.id == id).cloned())
    }

    async fn list_assets(&self, params: &AssetQuery) -> StoreResult<Vec<GeneratedAsset>> {
        let t = self.tables.lock().await;
        let status_id = params
            .status
            .as_deref()
            .and_then(AssetStatus::from_name)
            .map(AssetStatus::id);
        let mut rows: Vec<GeneratedAsset> = t
            .assets
            .iter()
            .filter(|a| params.category.as_ref().is_none_or(|c| &a.category == c))
            .filter(|a| params.asset_key.as_ref().is_none_or(|k| &a.asset_key == k))
            .filter(|a| status_id.is_none_or(|s| a.status_id == s))
            .cloned()
            .collect();
        rows.sort_by_key(|a| Reverse((a.created_at, a.id)));
        let offset = params.offset.unwrap_or(0).max(0) as usize;
        let limit = params.limit.unwrap_or(100).max(0) as usize;
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_versions(
        &self,
        category: &str,
        asset_key: &str,
    ) -> StoreResult<Vec<GeneratedAsset>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<GeneratedAsset> = t
            .assets
            .iter()
            .filter(|a| a.category == category && a.asset_key == asset_key)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.variant);
        Ok(rows)
    }

    async fn list_approved(&self, category: &str) -> StoreResult<Vec<GeneratedAsset>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<GeneratedAsset> = t
            .assets
            .iter()
            .filter(|a| a.category == category && a.status_id == AssetStatus::Approved.id())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.asset_key
                .cmp(&b.asset_key)
                .then(b.is_active.cmp(&a.is_active))
                .then(b.variant.cmp(&a.variant))
        });
        Ok(rows)
    }

    async fn mark_generating(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        if t.asset_mut(id).map(|a| a.status_id) != Some(AssetStatus::Pending.id()) {
            return Ok(None);
        }
        Ok(t.update_asset(id, |a| {
            a.status_id = AssetStatus::Generating.id();
            a.error_message = None;
        }))
    }

    async fn complete_generation(
        &self,
        id: DbId,
        storage_key: &str,
        generation_model: Option<&str>,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| {
            a.status_id = AssetStatus::Completed.id();
            a.original_key = Some(storage_key.to_string());
            a.private_key = Some(storage_key.to_string());
            if let Some(model) = generation_model {
                a.generation_model = Some(model.to_string());
            }
            a.error_message = None;
        }))
    }

    async fn fail_generation(
        &self,
        id: DbId,
        message: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| {
            a.status_id = AssetStatus::Failed.id();
            a.error_message = Some(message.to_string());
        }))
    }

    async fn set_asset_status(
        &self,
        id: DbId,
        status: AssetStatus,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| a.status_id = status.id()))
    }

    async fn approve_and_activate(
        &self,
        id: DbId,
        actor: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        let approvable = t
            .asset_mut(id)
            .and_then(|a| AssetStatus::from_id(a.status_id))
            .is_some_and(AssetStatus::is_approvable);
        if !approvable {
            return Ok(None);
        }
        t.deactivate_siblings(id);
        Ok(t.update_asset(id, |a| {
            a.status_id = AssetStatus::Approved.id();
            a.is_active = true;
            a.approved_at = Some(Utc::now());
            a.approved_by = Some(actor.to_string());
        }))
    }

    async fn activate(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        if t.asset_mut(id).map(|a| a.status_id) != Some(AssetStatus::Approved.id()) {
            return Ok(None);
        }
        t.deactivate_siblings(id);
        Ok(t.update_asset(id, |a| a.is_active = true))
    }

    async fn archive_asset(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| {
            a.status_id = AssetStatus::Archived.id();
            a.is_active = false;
        }))
    }

    async fn reject_asset(
        &self,
        input: &CreateAssetRejection,
        feedback_prompt: Option<&str>,
    ) -> StoreResult<Option<(GeneratedAsset, AssetRejection)>> {
        let mut t = self.tables.lock().await;
        let Some(asset) = t.update_asset(input.asset_id, |a| {
            a.status_id = AssetStatus::Rejected.id();
            a.is_active = false;
            a.rejection_count += 1;
            if let Some(prompt) = feedback_prompt {
                a.current_prompt = prompt.to_string();
                a.prompt_version += 1;
            }
        }) else {
            return Ok(None);
        };
        let rejection = AssetRejection {
            id: t.next_id(),
            asset_id: input.asset_id,
            reason: input.reason.clone(),
            prompt_snapshot: input.prompt_snapshot.clone(),
            storage_key_snapshot: input.storage_key_snapshot.clone(),
            actor: input.actor.clone(),
            created_at: Utc::now(),
        };
        t.rejections.push(rejection.clone());
        Ok(Some((asset, rejection)))
    }

    async fn list_rejections(&self, asset_id: DbId) -> StoreResult<Vec<AssetRejection>> {
        let t = self.tables.lock().await;
        Ok(t.rejections
            .iter()
            .filter(|r| r.asset_id == asset_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PipelineStateRepository for MemoryStore {
    async fn claim_pipeline(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        let processing = PipelineStatus::Processing.id();
        let Some(asset) = t.asset_mut(id) else {
            return Ok(None);
        };
        if asset.pipeline_status_id == Some(processing) {
            return Ok(None);
        }
        Ok(t.update_asset(id, |a| {
            a.pipeline_status_id = Some(processing);
            a.pipeline_started_at = Some(Utc::now());
            a.pipeline_completed_at = None;
            a.pipeline_error = None;
        }))
    }

    async fn record_processed(
        &self,
        id: DbId,
        private_key: &str,
        processed_key: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| {
            a.private_key = Some(private_key.to_string());
            a.processed_key = Some(processed_key.to_string());
        }))
    }

    async fn record_pipeline_warning(
        &self,
        id: DbId,
        message: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| a.pipeline_error = Some(message.to_string())))
    }

    async fn publish_asset(
        &self,
        id: DbId,
        public_key: &str,
        public_url: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| {
            a.public_key = Some(public_key.to_string());
            a.public_url = Some(public_url.to_string());
            a.background_removed = true;
        }))
    }

    async fn complete_pipeline(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| {
            a.pipeline_status_id = Some(PipelineStatus::Completed.id());
            a.pipeline_completed_at = Some(Utc::now());
        }))
    }

    async fn fail_pipeline(&self, id: DbId, message: &str) -> StoreResult<Option<GeneratedAsset>> {
        let mut t = self.tables.lock().await;
        Ok(t.update_asset(id, |a| {
            a.pipeline_status_id = Some(PipelineStatus::Failed.id());
            a.pipeline_error = Some(message.to_string());
            a.pipeline_completed_at = Some(Utc::now());
        }))
    }

    async fn recover_interrupted_pipelines(&self, message: &str) -> StoreResult<Vec<DbId>> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let mut recovered = Vec::new();
        for a in t
            .assets
            .iter_mut()
            .filter(|a| a.pipeline_status_id == Some(PipelineStatus::Processing.id()))
        {
            a.pipeline_status_id = Some(PipelineStatus::Failed.id());
            a.pipeline_error = Some(message.to_string());
            a.pipeline_completed_at = Some(now);
            a.updated_at = now;
            recovered.push(a.id);
        }
        Ok(recovered)
    }

    async fn list_pipeline_backlog(&self, categories: &[String]) -> StoreResult<Vec<DbId>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<&GeneratedAsset> = t
            .assets
            .iter()
            .filter(|a| {
                a.status_id == AssetStatus::Approved.id()
                    && categories.contains(&a.category)
                    && !a.background_removed
                    && a.pipeline_status_id.is_none()
            })
            .collect();
        rows.sort_by_key(|a| (a.approved_at.is_none(), a.approved_at, a.id));
        Ok(rows.into_iter().map(|a| a.id).collect())
    }
}

#[async_trait]
impl GenerationQueueRepository for MemoryStore {
    async fn enqueue_generation(
        &self,
        asset_id: DbId,
        status: QueueStatus,
    ) -> StoreResult<GenerationQueueEntry> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let entry = GenerationQueueEntry {
            id: t.next_id(),
            asset_id,
            status_id: status.id(),
            attempts: i32::from(status == QueueStatus::Processing),
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        t.queue.push(entry.clone());
        Ok(entry)
    }

    async fn claim_next_generation(&self) -> StoreResult<Option<GenerationQueueEntry>> {
        let mut t = self.tables.lock().await;
        let Some(entry) = t
            .queue
            .iter_mut()
            .filter(|e| e.status_id == QueueStatus::Pending.id())
            .min_by_key(|e| (e.created_at, e.id))
        else {
            return Ok(None);
        };
        entry.status_id = QueueStatus::Processing.id();
        entry.attempts += 1;
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn finish_generation(
        &self,
        id: DbId,
        status: QueueStatus,
        error_message: Option<&str>,
    ) -> StoreResult<Option<GenerationQueueEntry>> {
        let mut t = self.tables.lock().await;
        let Some(entry) = t.queue.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        entry.status_id = status.id();
        entry.error_message = error_message.map(str::to_string);
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn list_generation_entries(
        &self,
        asset_id: DbId,
    ) -> StoreResult<Vec<GenerationQueueEntry>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<GenerationQueueEntry> = t
            .queue
            .iter()
            .filter(|e| e.asset_id == asset_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| Reverse(e.id));
        Ok(rows)
    }

    async fn recover_interrupted_generations(&self, message: &str) -> StoreResult<Vec<DbId>> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let mut recovered = Vec::new();
        for e in t
            .queue
            .iter_mut()
            .filter(|e| e.status_id == QueueStatus::Processing.id())
        {
            e.status_id = QueueStatus::Failed.id();
            e.error_message = Some(message.to_string());
            e.updated_at = now;
            recovered.push(e.asset_id);
        }
        Ok(recovered)
    }
}

#[async_trait]
impl ConfigurationRepository for MemoryStore {
    async fn find_configuration(
        &self,
        category: &str,
        asset_key: &str,
    ) -> StoreResult<Option<AssetConfiguration>> {
        let t = self.tables.lock().await;
        Ok(t.configurations
            .iter()
            .find(|c| c.category == category && c.asset_key == asset_key)
            .cloned())
    }

    async fn upsert_configuration(
        &self,
        category: &str,
        asset_key: &str,
        input: &UpsertAssetConfiguration,
    ) -> StoreResult<AssetConfiguration> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        if let Some(existing) = t
            .configurations
            .iter_mut()
            .find(|c| c.category == category && c.asset_key == asset_key)
        {
            existing.active_sprite_id = Some(input.active_sprite_id);
            existing.cost_override = input.cost_override.or(existing.cost_override);
            existing.scale_override = input.scale_override.or(existing.scale_override);
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = AssetConfiguration {
            id: t.next_id(),
            category: category.to_string(),
            asset_key: asset_key.to_string(),
            active_sprite_id: Some(input.active_sprite_id),
            cost_override: input.cost_override,
            scale_override: input.scale_override,
            is_published: false,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        t.configurations.push(row.clone());
        Ok(row)
    }

    async fn set_configuration_published(
        &self,
        category: &str,
        asset_key: &str,
        published: bool,
    ) -> StoreResult<Option<AssetConfiguration>> {
        let mut t = self.tables.lock().await;
        let Some(row) = t
            .configurations
            .iter_mut()
            .find(|c| c.category == category && c.asset_key == asset_key)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        row.is_published = published;
        row.published_at = published.then_some(now);
        row.updated_at = now;
        Ok(Some(row.clone()))
    }
}

#[async_trait]
impl CompositeRepository for MemoryStore {
    async fn find_composite(
        &self,
        kind: &str,
        owner_key: &str,
        scope_key: &str,
    ) -> StoreResult<Option<CompositeCacheEntry>> {
        let t = self.tables.lock().await;
        Ok(t.composites
            .iter()
            .find(|c| c.kind == kind && c.owner_key == owner_key && c.scope_key == scope_key)
            .cloned())
    }

    async fn upsert_composite(
        &self,
        input: &UpsertCompositeCacheEntry,
    ) -> StoreResult<CompositeCacheEntry> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        if let Some(existing) = t.composites.iter_mut().find(|c| {
            c.kind == input.kind && c.owner_key == input.owner_key && c.scope_key == input.scope_key
        }) {
            existing.content_hash = input.content_hash.clone();
            existing.storage_key = input.storage_key.clone();
            existing.public_url = input.public_url.clone();
            existing.last_accessed_at = now;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = CompositeCacheEntry {
            id: t.next_id(),
            kind: input.kind.clone(),
            owner_key: input.owner_key.clone(),
            scope_key: input.scope_key.clone(),
            content_hash: input.content_hash.clone(),
            storage_key: input.storage_key.clone(),
            public_url: input.public_url.clone(),
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
        };
        t.composites.push(row.clone());
        Ok(row)
    }

    async fn touch_composite(&self, id: DbId) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if let Some(row) = t.composites.iter_mut().find(|c| c.id == id) {
            row.last_accessed_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_composites_by_owner(
        &self,
        kind: &str,
        owner_key: &str,
    ) -> StoreResult<Vec<CompositeCacheEntry>> {
        let mut t = self.tables.lock().await;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut t.composites)
            .into_iter()
            .partition(|c| c.kind == kind && c.owner_key == owner_key);
        t.composites = kept;
        Ok(removed)
    }

    async fn delete_composites_not_accessed_since(
        &self,
        cutoff: Timestamp,
    ) -> StoreResult<Vec<CompositeCacheEntry>> {
        let mut t = self.tables.lock().await;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut t.composites)
            .into_iter()
            .partition(|c| c.last_accessed_at < cutoff);
        t.composites = kept;
        Ok(removed)
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn append_audit(&self, input: &CreateAuditEntry) -> StoreResult<AuditEntry> {
        let mut t = self.tables.lock().await;
        let entry = AuditEntry {
            id: t.next_id(),
            actor: input.actor.clone(),
            action: input.action.clone(),
            entity_type: input.entity_type.clone(),
            entity_id: input.entity_id,
            details: input.details.clone(),
            created_at: Utc::now(),
        };
        t.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(&self, params: &AuditQuery) -> StoreResult<Vec<AuditEntry>> {
        let t = self.tables.lock().await;
        let limit = params.limit.unwrap_or(100).clamp(1, MAX_AUDIT_LIMIT) as usize;
        Ok(t.audit
            .iter()
            .rev()
            .filter(|e| params.entity_type.as_ref().is_none_or(|k| &e.entity_type == k))
            .filter(|e| params.entity_id.is_none_or(|id| e.entity_id == Some(id)))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetforge_core::category::AssetCategory;

    fn restaurant() -> CreateGeneratedAsset {
        CreateGeneratedAsset::new(AssetCategory::BuildingSprite, "restaurant", "prompt".into())
    }

    async fn completed(store: &MemoryStore) -> GeneratedAsset {
        let asset = store.create_asset(&restaurant()).await.unwrap();
        store
            .complete_generation(asset.id, "raw/key.png", None)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn variants_are_sequential_per_key() {
        let store = MemoryStore::new();
        let a = store.create_asset(&restaurant()).await.unwrap();
        let b = store.create_asset(&restaurant()).await.unwrap();
        let other = store
            .create_asset(&CreateGeneratedAsset::new(
                AssetCategory::BuildingSprite,
                "bakery",
                "p".into(),
            ))
            .await
            .unwrap();
        assert_eq!((a.variant, b.variant, other.variant), (1, 2, 1));
    }

    #[tokio::test]
    async fn create_if_absent_is_a_noop_when_key_exists() {
        let store = MemoryStore::new();
        assert!(store.create_asset_if_absent(&restaurant()).await.unwrap().is_some());
        assert!(store.create_asset_if_absent(&restaurant()).await.unwrap().is_none());
        assert_eq!(store.list_versions("building_sprite", "restaurant").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approve_deactivates_siblings() {
        let store = MemoryStore::new();
        let first = completed(&store).await;
        let second = completed(&store).await;

        store.approve_and_activate(first.id, "admin").await.unwrap().unwrap();
        store.approve_and_activate(second.id, "admin").await.unwrap().unwrap();

        let rows = store.list_versions("building_sprite", "restaurant").await.unwrap();
        let active: Vec<_> = rows.iter().filter(|a| a.is_active).map(|a| a.id).collect();
        assert_eq!(active, vec![second.id]);
    }

    #[tokio::test]
    async fn approve_from_pending_changes_nothing() {
        let store = MemoryStore::new();
        let first = completed(&store).await;
        store.approve_and_activate(first.id, "admin").await.unwrap();
        let pending = store.create_asset(&restaurant()).await.unwrap();

        assert!(store.approve_and_activate(pending.id, "admin").await.unwrap().is_none());
        assert!(store.find_asset(first.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn pipeline_claim_is_exclusive() {
        let store = MemoryStore::new();
        let asset = completed(&store).await;
        assert!(store.claim_pipeline(asset.id).await.unwrap().is_some());
        assert!(store.claim_pipeline(asset.id).await.unwrap().is_none());
        store.fail_pipeline(asset.id, "boom").await.unwrap();
        assert!(store.claim_pipeline(asset.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn claim_on_missing_row_returns_none() {
        let store = MemoryStore::new();
        assert!(store.claim_pipeline(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queue_claims_oldest_pending_once() {
        let store = MemoryStore::new();
        let a = store.create_asset(&restaurant()).await.unwrap();
        store.enqueue_generation(a.id, QueueStatus::Pending).await.unwrap();
        let claimed = store.claim_next_generation().await.unwrap().unwrap();
        assert_eq!(claimed.asset_id, a.id);
        assert_eq!(claimed.attempts, 1);
        assert!(store.claim_next_generation().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn composites_evicted_by_owner() {
        let store = MemoryStore::new();
        for scope in ["office", "lobby"] {
            store
                .upsert_composite(&UpsertCompositeCacheEntry {
                    kind: "scene".into(),
                    owner_key: "company_1".into(),
                    scope_key: scope.into(),
                    content_hash: "h".into(),
                    storage_key: format!("k/{scope}"),
                    public_url: format!("u/{scope}"),
                })
                .await
                .unwrap();
        }
        let removed = store.delete_composites_by_owner("scene", "company_1").await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store
            .find_composite("scene", "company_1", "office")
            .await
            .unwrap()
            .is_none());
    }
}
