//! Repository for the `generated_assets` table.
//!
//! Lifecycle transitions are dedicated methods rather than a generic patch,
//! so each one can clear fields (errors, timestamps) and guard on the
//! current status in the same statement.

use assetforge_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::generated_asset::{AssetQuery, CreateGeneratedAsset, GeneratedAsset};
use crate::models::status::{AssetStatus, PipelineStatus};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, category, asset_key, variant, sprite_variant, parent_asset_id, \
    status_id, pipeline_status_id, is_active, background_removed, original_key, private_key, \
    processed_key, public_key, public_url, base_prompt, current_prompt, prompt_version, \
    rejection_count, generation_settings, generation_model, \"references\", error_message, \
    pipeline_error, approved_at, approved_by, pipeline_started_at, pipeline_completed_at, \
    created_at, updated_at";

/// Column list for callers outside this module that return asset rows.
pub(crate) fn columns() -> &'static str {
    COLUMNS
}

/// Default page size for unfiltered listings.
const DEFAULT_LIMIT: i64 = 100;

/// Provides versioning, lifecycle and pipeline-state operations for generated assets.
pub struct GeneratedAssetRepo;

impl GeneratedAssetRepo {
    // ── Versioning ───────────────────────────────────────────────────

    /// Insert a new version as `pending`, assigning the next variant number
    /// for its (category, asset_key).
    pub async fn create(
        pool: &PgPool,
        input: &CreateGeneratedAsset,
    ) -> Result<GeneratedAsset, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_assets
                (category, asset_key, variant, sprite_variant, parent_asset_id, status_id,
                 base_prompt, current_prompt, prompt_version, rejection_count,
                 generation_settings, generation_model, \"references\")
             VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(variant), 0) + 1 FROM generated_assets
                  WHERE category = $1 AND asset_key = $2),
                $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(&input.category)
            .bind(&input.asset_key)
            .bind(&input.sprite_variant)
            .bind(input.parent_asset_id)
            .bind(AssetStatus::Pending.id())
            .bind(&input.base_prompt)
            .bind(&input.current_prompt)
            .bind(input.prompt_version)
            .bind(input.rejection_count)
            .bind(&input.generation_settings)
            .bind(&input.generation_model)
            .bind(Json(&input.references))
            .fetch_one(pool)
            .await
    }

    /// Insert a first version only when no row exists for the
    /// (category, asset_key). Returns `None` when one already exists.
    pub async fn create_if_absent(
        pool: &PgPool,
        input: &CreateGeneratedAsset,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_assets
                (category, asset_key, variant, sprite_variant, parent_asset_id, status_id,
                 base_prompt, current_prompt, prompt_version, rejection_count,
                 generation_settings, generation_model, \"references\")
             SELECT $1, $2, 1, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
             WHERE NOT EXISTS (
                SELECT 1 FROM generated_assets WHERE category = $1 AND asset_key = $2
             )
             ON CONFLICT (category, asset_key, variant) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(&input.category)
            .bind(&input.asset_key)
            .bind(&input.sprite_variant)
            .bind(input.parent_asset_id)
            .bind(AssetStatus::Pending.id())
            .bind(&input.base_prompt)
            .bind(&input.current_prompt)
            .bind(input.prompt_version)
            .bind(input.rejection_count)
            .bind(&input.generation_settings)
            .bind(&input.generation_model)
            .bind(Json(&input.references))
            .fetch_optional(pool)
            .await
    }

    /// Find a version by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generated_assets WHERE id = $1");
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List versions matching the optional filters, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &AssetQuery,
        status_id: Option<i16>,
    ) -> Result<Vec<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_assets
             WHERE ($1::TEXT IS NULL OR category = $1)
               AND ($2::TEXT IS NULL OR asset_key = $2)
               AND ($3::SMALLINT IS NULL OR status_id = $3)
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(&params.category)
            .bind(&params.asset_key)
            .bind(status_id)
            .bind(params.limit.unwrap_or(DEFAULT_LIMIT))
            .bind(params.offset.unwrap_or(0))
            .fetch_all(pool)
            .await
    }

    /// Every version of a logical key, ordered by variant ascending.
    pub async fn list_versions(
        pool: &PgPool,
        category: &str,
        asset_key: &str,
    ) -> Result<Vec<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_assets
             WHERE category = $1 AND asset_key = $2
             ORDER BY variant ASC"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(category)
            .bind(asset_key)
            .fetch_all(pool)
            .await
    }

    /// Approved versions in a category: active rows first, then newest variant.
    pub async fn list_approved(
        pool: &PgPool,
        category: &str,
    ) -> Result<Vec<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_assets
             WHERE category = $1 AND status_id = $2
             ORDER BY asset_key ASC, is_active DESC, variant DESC"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(category)
            .bind(AssetStatus::Approved.id())
            .fetch_all(pool)
            .await
    }

    // ── Generation lifecycle ─────────────────────────────────────────

    /// `pending` -> `generating`. Returns `None` if the row is not pending.
    pub async fn mark_generating(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET status_id = $2, error_message = NULL
             WHERE id = $1 AND status_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(AssetStatus::Generating.id())
            .bind(AssetStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Record the raw output location and flip to `completed`.
    pub async fn complete_generation(
        pool: &PgPool,
        id: DbId,
        storage_key: &str,
        generation_model: Option<&str>,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET
                status_id = $2,
                original_key = $3,
                private_key = $3,
                generation_model = COALESCE($4, generation_model),
                error_message = NULL
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(AssetStatus::Completed.id())
            .bind(storage_key)
            .bind(generation_model)
            .fetch_optional(pool)
            .await
    }

    /// Flip to `failed` with the error text preserved.
    pub async fn fail_generation(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET status_id = $2, error_message = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(AssetStatus::Failed.id())
            .bind(message)
            .fetch_optional(pool)
            .await
    }

    /// Set the status unconditionally. Used for `review` <-> `completed`.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: AssetStatus,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET status_id = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(status.id())
            .fetch_optional(pool)
            .await
    }

    // ── Approval ─────────────────────────────────────────────────────

    /// Lock the key's versions, deactivate every sibling, then approve and
    /// activate `id`, in one transaction. Only legal from `completed` or `review`; returns `None`
    /// (and rolls back) otherwise.
    pub async fn approve_and_activate(
        pool: &PgPool,
        id: DbId,
        actor: &str,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        lock_key_group(&mut tx, id).await?;
        deactivate_siblings(&mut tx, id).await?;

        let query = format!(
            "UPDATE generated_assets SET
                status_id = $2, is_active = true, approved_at = NOW(), approved_by = $3
             WHERE id = $1 AND status_id IN ($4, $5)
             RETURNING {COLUMNS}"
        );
        let approved = sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(AssetStatus::Approved.id())
            .bind(actor)
            .bind(AssetStatus::Completed.id())
            .bind(AssetStatus::Review.id())
            .fetch_optional(&mut *tx)
            .await?;

        match approved {
            Some(row) => {
                tx.commit().await?;
                Ok(Some(row))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    /// Lock the key's versions, deactivate every sibling, then activate `id`,
    /// in one transaction.
    /// Only legal on an approved row; returns `None` (and rolls back) otherwise.
    pub async fn activate(pool: &PgPool, id: DbId) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        lock_key_group(&mut tx, id).await?;
        deactivate_siblings(&mut tx, id).await?;

        let query = format!(
            "UPDATE generated_assets SET is_active = true
             WHERE id = $1 AND status_id = $2
             RETURNING {COLUMNS}"
        );
        let activated = sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(AssetStatus::Approved.id())
            .fetch_optional(&mut *tx)
            .await?;

        match activated {
            Some(row) => {
                tx.commit().await?;
                Ok(Some(row))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    /// Soft-hide a version. Archived rows are never active.
    pub async fn archive(pool: &PgPool, id: DbId) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET status_id = $2, is_active = false
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(AssetStatus::Archived.id())
            .fetch_optional(pool)
            .await
    }

    // ── Post-approval pipeline ───────────────────────────────────────

    /// Atomically claim a pipeline run: sets `processing` unless a run is
    /// already in flight. Returns `None` if the claim was lost.
    pub async fn claim_pipeline(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET
                pipeline_status_id = $2,
                pipeline_started_at = NOW(),
                pipeline_completed_at = NULL,
                pipeline_error = NULL
             WHERE id = $1 AND pipeline_status_id IS DISTINCT FROM $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(PipelineStatus::Processing.id())
            .fetch_optional(pool)
            .await
    }

    /// Point `private_key` at the background-removed object and record the
    /// `processed/` copy.
    pub async fn record_processed(
        pool: &PgPool,
        id: DbId,
        private_key: &str,
        processed_key: &str,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET private_key = $2, processed_key = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(private_key)
            .bind(processed_key)
            .fetch_optional(pool)
            .await
    }

    /// Record a non-fatal pipeline error without changing the run status.
    pub async fn record_pipeline_warning(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET pipeline_error = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(message)
            .fetch_optional(pool)
            .await
    }

    /// Record the published location together with `background_removed`.
    pub async fn publish(
        pool: &PgPool,
        id: DbId,
        public_key: &str,
        public_url: &str,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET
                public_key = $2, public_url = $3, background_removed = true
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(public_key)
            .bind(public_url)
            .fetch_optional(pool)
            .await
    }

    /// `processing` -> `completed`.
    pub async fn complete_pipeline(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET
                pipeline_status_id = $2, pipeline_completed_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(PipelineStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }

    /// `processing` -> `failed` with the error text.
    pub async fn fail_pipeline(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<GeneratedAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_assets SET
                pipeline_status_id = $2, pipeline_error = $3, pipeline_completed_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedAsset>(&query)
            .bind(id)
            .bind(PipelineStatus::Failed.id())
            .bind(message)
            .fetch_optional(pool)
            .await
    }

    /// Fail every run left in `processing` by a previous process. Returns the
    /// affected asset IDs.
    pub async fn recover_interrupted_pipelines(
        pool: &PgPool,
        message: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "UPDATE generated_assets SET
                pipeline_status_id = $1, pipeline_error = $2, pipeline_completed_at = NOW()
             WHERE pipeline_status_id = $3
             RETURNING id",
        )
        .bind(PipelineStatus::Failed.id())
        .bind(message)
        .bind(PipelineStatus::Processing.id())
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Approved rows in the given categories that never had a pipeline run.
    pub async fn list_pipeline_backlog(
        pool: &PgPool,
        categories: &[String],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM generated_assets
             WHERE status_id = $1
               AND category = ANY($2)
               AND background_removed = false
               AND pipeline_status_id IS NULL
             ORDER BY approved_at ASC NULLS LAST, id ASC",
        )
        .bind(AssetStatus::Approved.id())
        .bind(categories)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}

/// Row-lock every version of `id`'s logical key. A concurrent approval or
/// activation of a sibling waits here until this transaction ends, so its
/// deactivate step sees this transaction's activation.
async fn lock_key_group(tx: &mut Transaction<'_, Postgres>, id: DbId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "SELECT id FROM generated_assets
         WHERE (category, asset_key) = (SELECT category, asset_key FROM generated_assets WHERE id = $1)
         ORDER BY id
         FOR UPDATE",
    )
    .bind(id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(())
}

async fn deactivate_siblings(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE generated_assets SET is_active = false
         WHERE (category, asset_key) = (SELECT category, asset_key FROM generated_assets WHERE id = $1)
           AND id <> $1 AND is_active = true",
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
