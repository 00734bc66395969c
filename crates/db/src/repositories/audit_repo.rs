//! Repository for the insert-only `audit_log` table.

use sqlx::PgPool;

use crate::models::audit::{AuditEntry, AuditQuery, CreateAuditEntry};

const COLUMNS: &str = "id, actor, action, entity_type, entity_id, details, created_at";

/// Maximum rows returned by a single audit query.
pub const MAX_AUDIT_LIMIT: i64 = 500;

/// Provides insert and query operations for the audit trail.
pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn insert(pool: &PgPool, input: &CreateAuditEntry) -> Result<AuditEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_log (actor, action, entity_type, entity_id, details)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(&input.actor)
            .bind(&input.action)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.details)
            .fetch_one(pool)
            .await
    }

    /// Entries matching the filters, newest first.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let limit = params.limit.unwrap_or(100).clamp(1, MAX_AUDIT_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM audit_log
             WHERE ($1::TEXT IS NULL OR entity_type = $1)
               AND ($2::BIGINT IS NULL OR entity_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(&params.entity_type)
            .bind(params.entity_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
