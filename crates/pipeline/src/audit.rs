//! Audit trail writes. A failed audit insert is logged and never fails the
//! mutation it describes, which has already been committed.

use assetforge_core::types::DbId;
use assetforge_db::models::audit::CreateAuditEntry;
use assetforge_db::store::AssetStore;

pub(crate) async fn record_asset(
    store: &dyn AssetStore,
    actor: &str,
    action: &str,
    asset_id: DbId,
    details: serde_json::Value,
) {
    record(store, CreateAuditEntry::asset(actor, action, asset_id, details)).await;
}

pub(crate) async fn record(store: &dyn AssetStore, entry: CreateAuditEntry) {
    if let Err(e) = store.append_audit(&entry).await {
        tracing::warn!(
            action = %entry.action,
            entity_id = entry.entity_id,
            error = %e,
            "Failed to append audit entry"
        );
    }
}
