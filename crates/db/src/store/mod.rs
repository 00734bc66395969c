//! The store traits the pipeline is written against.
//!
//! [`AssetStore`] combines one trait per table family so callers can hold a
//! single `Arc<dyn AssetStore>`. [`PgAssetStore`] delegates to the `*Repo`
//! structs; [`MemoryStore`] keeps everything behind a mutex and mirrors the
//! SQL semantics for tests and local runs.

use assetforge_core::types::{DbId, Timestamp};
use async_trait::async_trait;

use crate::models::audit::{AuditEntry, AuditQuery, CreateAuditEntry};
use crate::models::composite::{CompositeCacheEntry, UpsertCompositeCacheEntry};
use crate::models::configuration::{AssetConfiguration, UpsertAssetConfiguration};
use crate::models::generated_asset::{AssetQuery, CreateGeneratedAsset, GeneratedAsset};
use crate::models::generation_queue::GenerationQueueEntry;
use crate::models::rejection::{AssetRejection, CreateAssetRejection};
use crate::models::status::{AssetStatus, QueueStatus};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgAssetStore;

/// PostgreSQL SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Generated asset versions, approval and rejection.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Insert a `pending` version at the next variant number.
    async fn create_asset(&self, input: &CreateGeneratedAsset) -> StoreResult<GeneratedAsset>;

    /// Insert variant 1 unless any row exists for the (category, asset_key).
    async fn create_asset_if_absent(
        &self,
        input: &CreateGeneratedAsset,
    ) -> StoreResult<Option<GeneratedAsset>>;

    async fn find_asset(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>>;

    async fn list_assets(&self, params: &AssetQuery) -> StoreResult<Vec<GeneratedAsset>>;

    /// All versions of a logical key, variant ascending.
    async fn list_versions(
        &self,
        category: &str,
        asset_key: &str,
    ) -> StoreResult<Vec<GeneratedAsset>>;

    /// Approved rows in a category, grouped by key with active rows first.
    async fn list_approved(&self, category: &str) -> StoreResult<Vec<GeneratedAsset>>;

    async fn mark_generating(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>>;

    async fn complete_generation(
        &self,
        id: DbId,
        storage_key: &str,
        generation_model: Option<&str>,
    ) -> StoreResult<Option<GeneratedAsset>>;

    async fn fail_generation(&self, id: DbId, message: &str)
        -> StoreResult<Option<GeneratedAsset>>;

    async fn set_asset_status(
        &self,
        id: DbId,
        status: AssetStatus,
    ) -> StoreResult<Option<GeneratedAsset>>;

    /// Deactivate siblings, then approve and activate. `None` when the row
    /// is missing or not approvable; nothing is changed in that case.
    async fn approve_and_activate(
        &self,
        id: DbId,
        actor: &str,
    ) -> StoreResult<Option<GeneratedAsset>>;

    /// Deactivate siblings, then activate an approved row. `None` when the
    /// row is missing or not approved; nothing is changed in that case.
    async fn activate(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>>;

    async fn archive_asset(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>>;

    /// Append a rejection and mark the asset rejected, atomically.
    async fn reject_asset(
        &self,
        input: &CreateAssetRejection,
        feedback_prompt: Option<&str>,
    ) -> StoreResult<Option<(GeneratedAsset, AssetRejection)>>;

    async fn list_rejections(&self, asset_id: DbId) -> StoreResult<Vec<AssetRejection>>;
}

/// Post-approval pipeline state on asset rows.
#[async_trait]
pub trait PipelineStateRepository: Send + Sync {
    /// Set `processing` unless a run is already in flight.
    async fn claim_pipeline(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>>;

    async fn record_processed(
        &self,
        id: DbId,
        private_key: &str,
        processed_key: &str,
    ) -> StoreResult<Option<GeneratedAsset>>;

    async fn record_pipeline_warning(
        &self,
        id: DbId,
        message: &str,
    ) -> StoreResult<Option<GeneratedAsset>>;

    async fn publish_asset(
        &self,
        id: DbId,
        public_key: &str,
        public_url: &str,
    ) -> StoreResult<Option<GeneratedAsset>>;

    async fn complete_pipeline(&self, id: DbId) -> StoreResult<Option<GeneratedAsset>>;

    async fn fail_pipeline(&self, id: DbId, message: &str) -> StoreResult<Option<GeneratedAsset>>;

    /// Fail every run stuck in `processing`; returns the asset IDs.
    async fn recover_interrupted_pipelines(&self, message: &str) -> StoreResult<Vec<DbId>>;

    /// Approved, unprocessed rows in `categories` that never had a run.
    async fn list_pipeline_backlog(&self, categories: &[String]) -> StoreResult<Vec<DbId>>;
}

/// The generation queue.
#[async_trait]
pub trait GenerationQueueRepository: Send + Sync {
    async fn enqueue_generation(
        &self,
        asset_id: DbId,
        status: QueueStatus,
    ) -> StoreResult<GenerationQueueEntry>;

    async fn claim_next_generation(&self) -> StoreResult<Option<GenerationQueueEntry>>;

    async fn finish_generation(
        &self,
        id: DbId,
        status: QueueStatus,
        error_message: Option<&str>,
    ) -> StoreResult<Option<GenerationQueueEntry>>;

    async fn list_generation_entries(&self, asset_id: DbId)
        -> StoreResult<Vec<GenerationQueueEntry>>;

    /// Fail entries stuck in `processing`; returns their asset IDs.
    async fn recover_interrupted_generations(&self, message: &str) -> StoreResult<Vec<DbId>>;
}

/// Live-game configuration rows.
#[async_trait]
pub trait ConfigurationRepository: Send + Sync {
    async fn find_configuration(
        &self,
        category: &str,
        asset_key: &str,
    ) -> StoreResult<Option<AssetConfiguration>>;

    async fn upsert_configuration(
        &self,
        category: &str,
        asset_key: &str,
        input: &UpsertAssetConfiguration,
    ) -> StoreResult<AssetConfiguration>;

    async fn set_configuration_published(
        &self,
        category: &str,
        asset_key: &str,
        published: bool,
    ) -> StoreResult<Option<AssetConfiguration>>;
}

/// The composite cache.
#[async_trait]
pub trait CompositeRepository: Send + Sync {
    async fn find_composite(
        &self,
        kind: &str,
        owner_key: &str,
        scope_key: &str,
    ) -> StoreResult<Option<CompositeCacheEntry>>;

    async fn upsert_composite(
        &self,
        input: &UpsertCompositeCacheEntry,
    ) -> StoreResult<CompositeCacheEntry>;

    async fn touch_composite(&self, id: DbId) -> StoreResult<()>;

    async fn delete_composites_by_owner(
        &self,
        kind: &str,
        owner_key: &str,
    ) -> StoreResult<Vec<CompositeCacheEntry>>;

    async fn delete_composites_not_accessed_since(
        &self,
        cutoff: Timestamp,
    ) -> StoreResult<Vec<CompositeCacheEntry>>;
}

/// The insert-only audit trail.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append_audit(&self, input: &CreateAuditEntry) -> StoreResult<AuditEntry>;

    async fn list_audit(&self, params: &AuditQuery) -> StoreResult<Vec<AuditEntry>>;
}

/// Combined store trait.
#[async_trait]
pub trait AssetStore:
    AssetRepository
    + PipelineStateRepository
    + GenerationQueueRepository
    + ConfigurationRepository
    + CompositeRepository
    + AuditRepository
    + Send
    + Sync
{
    /// Check connectivity.
    async fn health_check(&self) -> StoreResult<()>;
}
