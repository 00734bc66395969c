//! Repository for the `generation_queue` table.

use assetforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::generation_queue::GenerationQueueEntry;
use crate::models::status::QueueStatus;

const COLUMNS: &str = "id, asset_id, status_id, attempts, error_message, created_at, updated_at";

/// Provides enqueue, claim and completion operations for generation runs.
pub struct GenerationQueueRepo;

impl GenerationQueueRepo {
    /// Add an entry for `asset_id` in the given initial status.
    ///
    /// Callers that run the generation inline insert it as `processing`;
    /// auto-enqueued dependents are inserted `pending` for the worker.
    pub async fn enqueue(
        pool: &PgPool,
        asset_id: DbId,
        status: QueueStatus,
    ) -> Result<GenerationQueueEntry, sqlx::Error> {
        let attempts = i32::from(status == QueueStatus::Processing);
        let query = format!(
            "INSERT INTO generation_queue (asset_id, status_id, attempts)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationQueueEntry>(&query)
            .bind(asset_id)
            .bind(status.id())
            .bind(attempts)
            .fetch_one(pool)
            .await
    }

    /// Claim the oldest pending entry, skipping rows locked by other workers.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<GenerationQueueEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_queue SET status_id = $1, attempts = attempts + 1
             WHERE id = (
                SELECT id FROM generation_queue
                WHERE status_id = $2
                ORDER BY created_at ASC, id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationQueueEntry>(&query)
            .bind(QueueStatus::Processing.id())
            .bind(QueueStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark an entry finished.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        status: QueueStatus,
        error_message: Option<&str>,
    ) -> Result<Option<GenerationQueueEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_queue SET status_id = $2, error_message = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationQueueEntry>(&query)
            .bind(id)
            .bind(status.id())
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }

    /// Entries for an asset, newest first.
    pub async fn list_by_asset(
        pool: &PgPool,
        asset_id: DbId,
    ) -> Result<Vec<GenerationQueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_queue WHERE asset_id = $1 ORDER BY id DESC"
        );
        sqlx::query_as::<_, GenerationQueueEntry>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }

    /// Fail entries left in `processing` by a previous process and return
    /// their asset IDs.
    pub async fn recover_interrupted(
        pool: &PgPool,
        message: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "UPDATE generation_queue SET status_id = $1, error_message = $2
             WHERE status_id = $3
             RETURNING asset_id",
        )
        .bind(QueueStatus::Failed.id())
        .bind(message)
        .bind(QueueStatus::Processing.id())
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
