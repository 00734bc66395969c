//! Insert-only audit trail of every mutation.

use assetforge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `audit_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: DbId,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub details: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for appending an audit entry.
#[derive(Debug, Clone)]
pub struct CreateAuditEntry {
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub details: serde_json::Value,
}

impl CreateAuditEntry {
    /// Entry against a generated asset.
    pub fn asset(actor: &str, action: &str, asset_id: DbId, details: serde_json::Value) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            entity_type: "generated_asset".to_string(),
            entity_id: Some(asset_id),
            details,
        }
    }

    /// Entry against the composite cache. Bulk removals carry no single id.
    pub fn composite(
        actor: &str,
        action: &str,
        entry_id: Option<DbId>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            entity_type: "composite".to_string(),
            entity_id: entry_id,
            details,
        }
    }
}

/// Query parameters for listing audit entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub limit: Option<i64>,
}
