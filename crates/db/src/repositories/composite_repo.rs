//! Repository for the `composite_cache` table.

use assetforge_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::composite::{CompositeCacheEntry, UpsertCompositeCacheEntry};

const COLUMNS: &str = "id, kind, owner_key, scope_key, content_hash, storage_key, public_url, \
    last_accessed_at, created_at, updated_at";

/// Provides slot lookup, replacement and eviction for cached composites.
pub struct CompositeCacheRepo;

impl CompositeCacheRepo {
    pub async fn find(
        pool: &PgPool,
        kind: &str,
        owner_key: &str,
        scope_key: &str,
    ) -> Result<Option<CompositeCacheEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM composite_cache
             WHERE kind = $1 AND owner_key = $2 AND scope_key = $3"
        );
        sqlx::query_as::<_, CompositeCacheEntry>(&query)
            .bind(kind)
            .bind(owner_key)
            .bind(scope_key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the slot's hash and location.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertCompositeCacheEntry,
    ) -> Result<CompositeCacheEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO composite_cache
                (kind, owner_key, scope_key, content_hash, storage_key, public_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (kind, owner_key, scope_key) DO UPDATE SET
                content_hash = EXCLUDED.content_hash,
                storage_key = EXCLUDED.storage_key,
                public_url = EXCLUDED.public_url,
                last_accessed_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CompositeCacheEntry>(&query)
            .bind(&input.kind)
            .bind(&input.owner_key)
            .bind(&input.scope_key)
            .bind(&input.content_hash)
            .bind(&input.storage_key)
            .bind(&input.public_url)
            .fetch_one(pool)
            .await
    }

    /// Record a cache hit.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE composite_cache SET last_accessed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete every slot of `kind` for an owner, returning the removed rows.
    pub async fn delete_by_owner(
        pool: &PgPool,
        kind: &str,
        owner_key: &str,
    ) -> Result<Vec<CompositeCacheEntry>, sqlx::Error> {
        let query = format!(
            "DELETE FROM composite_cache WHERE kind = $1 AND owner_key = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CompositeCacheEntry>(&query)
            .bind(kind)
            .bind(owner_key)
            .fetch_all(pool)
            .await
    }

    /// Delete slots not accessed since `cutoff`, returning the removed rows.
    pub async fn delete_not_accessed_since(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<CompositeCacheEntry>, sqlx::Error> {
        let query = format!(
            "DELETE FROM composite_cache WHERE last_accessed_at < $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CompositeCacheEntry>(&query)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }
}
