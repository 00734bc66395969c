//! Postgres-backed [`AssetStore`](super::AssetStore), delegating to the repos.

use assetforge_core::types::{DbId, Timestamp};
use async_trait::async_trait;

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
use crate::models::status::{AssetStatus, QueueStatus};
use crate::repositories::{
    AssetConfigurationRepo, AssetRejectionRepo, AuditLogRepo, CompositeCacheRepo,
    GeneratedAssetRepo, GenerationQueueRepo,
};
use crate::DbPool;

#[derive(Clone)]
pub struct PgAssetStore {
    pool: DbPool,
}

impl PgAssetStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl AssetRepository for PgAssetStore {
    async fn create_asset(&self, input: &CreateGeneratedAsset) -> StoreResult<GeneratedAsset> {
        Ok(GeneratedAssetRepo::create(&self.pool, input).await?)
    }

    async fn create_asset_if_absent(
        &self,
        input: &CreateGeneratedAsset,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::create_if_absent(&self.pool, input).await?)
    }

    async fn find_asset(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_assets(&self, params: &AssetQuery) -> StoreResult<Vec<GeneratedAsset>> {
        let status_id = params
            .status
            .as_deref()
            .and_then(AssetStatus::from_name)
            .map(AssetStatus::id);
        Ok(GeneratedAssetRepo::list(&self.pool, params, status_id).await?)
    }

    async fn list_versions(
        &self,
        category: &str,
        asset_key: &str,
    ) -> StoreResult<Vec<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::list_versions(&self.pool, category, asset_key).await?)
    }

    async fn list_approved(&self, category: &str) -> StoreResult<Vec<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::list_approved(&self.pool, category).await?)
    }

    async fn mark_generating(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::mark_generating(&self.pool, id).await?)
    }

    async fn complete_generation(
        &self,
        id: DbId,
        storage_key: &str,
        generation_model: Option<&str>,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(
            GeneratedAssetRepo::complete_generation(&self.pool, id, storage_key, generation_model)
                .await?,
        )
    }

    async fn fail_generation(
        &self,
        id: DbId,
        message: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::fail_generation(&self.pool, id, message).await?)
    }

    async fn set_asset_status(
        &self,
        id: DbId,
        status: AssetStatus,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::set_status(&self.pool, id, status).await?)
    }

    async fn approve_and_activate(
        &self,
        id: DbId,
        actor: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::approve_and_activate(&self.pool, id, actor).await?)
    }

    async fn activate(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::activate(&self.pool, id).await?)
    }

    async fn archive_asset(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::archive(&self.pool, id).await?)
    }

    async fn reject_asset(
        &self,
        input: &CreateAssetRejection,
        feedback_prompt: Option<&str>,
    ) -> StoreResult<Option<(GeneratedAsset, AssetRejection)>> {
        Ok(AssetRejectionRepo::reject(&self.pool, input, feedback_prompt).await?)
    }

    async fn list_rejections(&self, asset_id: DbId) -> StoreResult<Vec<AssetRejection>> {
        Ok(AssetRejectionRepo::list_by_asset(&self.pool, asset_id).await?)
    }
}

#[async_trait]
impl PipelineStateRepository for PgAssetStore {
    async fn claim_pipeline(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::claim_pipeline(&self.pool, id).await?)
    }

    async fn record_processed(
        &self,
        id: DbId,
        private_key: &str,
        processed_key: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::record_processed(&self.pool, id, private_key, processed_key).await?)
    }

    async fn record_pipeline_warning(
        &self,
        id: DbId,
        message: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::record_pipeline_warning(&self.pool, id, message).await?)
    }

    async fn publish_asset(
        &self,
        id: DbId,
        public_key: &str,
        public_url: &str,
    ) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::publish(&self.pool, id, public_key, public_url).await?)
    }

    async fn complete_pipeline(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::complete_pipeline(&self.pool, id).await?)
    }

    async fn fail_pipeline(&self, id: DbId, message: &str) -> StoreResult<Option<GeneratedAsset>> {
        Ok(GeneratedAssetRepo::fail_pipeline(&self.pool, id, message).await?)
    }

    async fn recover_interrupted_pipelines(&self, message: &str) -> StoreResult<Vec<DbId>> {
        Ok(GeneratedAssetRepo::recover_interrupted_pipelines(&self.pool, message).await?)
    }

    async fn list_pipeline_backlog(&self, categories: &[String]) -> StoreResult<Vec<DbId>> {
        Ok(GeneratedAssetRepo::list_pipeline_backlog(&self.pool, categories).await?)
    }
}

#[async_trait]
impl GenerationQueueRepository for PgAssetStore {
    async fn enqueue_generation(
        &self,
        asset_id: DbId,
        status: QueueStatus,
    ) -> StoreResult<GenerationQueueEntry> {
        Ok(GenerationQueueRepo::enqueue(&self.pool, asset_id, status).await?)
    }

    async fn claim_next_generation(&self) -> StoreResult<Option<GenerationQueueEntry>> {
        Ok(GenerationQueueRepo::claim_next(&self.pool).await?)
    }

    async fn finish_generation(
        &self,
        id: DbId,
        status: QueueStatus,
        error_message: Option<&str>,
    ) -> StoreResult<Option<GenerationQueueEntry>> {
        Ok(GenerationQueueRepo::finish(&self.pool, id, status, error_message).await?)
    }

    async fn list_generation_entries(
        &self,
        asset_id: DbId,
    ) -> StoreResult<Vec<GenerationQueueEntry>> {
        Ok(GenerationQueueRepo::list_by_asset(&self.pool, asset_id).await?)
    }

    async fn recover_interrupted_generations(&self, message: &str) -> StoreResult<Vec<DbId>> {
        Ok(GenerationQueueRepo::recover_interrupted(&self.pool, message).await?)
    }
}

#[async_trait]
impl ConfigurationRepository for PgAssetStore {
    async fn find_configuration(
        &self,
        category: &str,
        asset_key: &str,
    ) -> StoreResult<Option<AssetConfiguration>> {
        Ok(AssetConfigurationRepo::find(&self.pool, category, asset_key).await?)
    }

    async fn upsert_configuration(
        &self,
        category: &str,
        asset_key: &str,
        input: &UpsertAssetConfiguration,
    ) -> StoreResult<AssetConfiguration> {
        Ok(AssetConfigurationRepo::upsert(&self.pool, category, asset_key, input).await?)
    }

    async fn set_configuration_published(
        &self,
        category: &str,
        asset_key: &str,
        published: bool,
    ) -> StoreResult<Option<AssetConfiguration>> {
        Ok(AssetConfigurationRepo::set_published(&self.pool, category, asset_key, published).await?)
    }
}

#[async_trait]
impl CompositeRepository for PgAssetStore {
    async fn find_composite(
        &self,
        kind: &str,
        owner_key: &str,
        scope_key: &str,
    ) -> StoreResult<Option<CompositeCacheEntry>> {
        Ok(CompositeCacheRepo::find(&self.pool, kind, owner_key, scope_key).await?)
    }

    async fn upsert_composite(
        &self,
        input: &UpsertCompositeCacheEntry,
    ) -> StoreResult<CompositeCacheEntry> {
        Ok(CompositeCacheRepo::upsert(&self.pool, input).await?)
    }

    async fn touch_composite(&self, id: DbId) -> StoreResult<()> {
        Ok(CompositeCacheRepo::touch(&self.pool, id).await?)
    }

    async fn delete_composites_by_owner(
        &self,
        kind: &str,
        owner_key: &str,
    ) -> StoreResult<Vec<CompositeCacheEntry>> {
        Ok(CompositeCacheRepo::delete_by_owner(&self.pool, kind, owner_key).await?)
    }

    async fn delete_composites_not_accessed_since(
        &self,
        cutoff: Timestamp,
    ) -> StoreResult<Vec<CompositeCacheEntry>> {
        Ok(CompositeCacheRepo::delete_not_accessed_since(&self.pool, cutoff).await?)
    }
}

#[async_trait]
impl AuditRepository for PgAssetStore {
    async fn append_audit(&self, input: &CreateAuditEntry) -> StoreResult<AuditEntry> {
        Ok(AuditLogRepo::insert(&self.pool, input).await?)
    }

    async fn list_audit(&self, params: &AuditQuery) -> StoreResult<Vec<AuditEntry>> {
        Ok(AuditLogRepo::query(&self.pool, params).await?)
    }
}

#[async_trait]
impl AssetStore for PgAssetStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
