//! Query parameter types shared by handlers.

use assetforge_core::types::DbId;
use serde::Deserialize;

/// `GET /assets` filters. With both `category` and `asset_key` set the
/// result is the full version history of that logical key.
#[derive(Debug, Default, Deserialize)]
pub struct AssetListParams {
    pub category: Option<String>,
    pub asset_key: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /audit` filters.
#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub limit: Option<i64>,
}

/// `PUT /composites/{kind}/{owner_key}` parameters. `constituents` is a
/// comma-separated list.
#[derive(Debug, Deserialize)]
pub struct CompositeStoreParams {
    #[serde(default)]
    pub scope_key: String,
    pub constituents: String,
}

impl CompositeStoreParams {
    pub fn constituent_list(&self) -> Vec<String> {
        self.constituents
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}
