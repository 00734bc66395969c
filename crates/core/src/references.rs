//! Reference image specifications attached to a generation request.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Where a reference image comes from.
///
/// Serialized as `{"kind": "library", "key": "..."}` or
/// `{"kind": "asset", "asset_id": 42}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceSpec {
    /// A user-supplied image stored in the private tier under `library/{key}`.
    Library { key: String },
    /// A previously generated asset. Must be approved.
    Asset { asset_id: DbId },
}

impl ReferenceSpec {
    /// Private-tier key of a library reference image.
    pub fn library_object_key(key: &str) -> String {
        format!("library/{key}")
    }
}

/// Why a reference image was included, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceRole {
    /// Explicitly requested by the user.
    User,
    /// The approved reference sheet of the sprite's family.
    Parent,
    /// Category-specific auxiliary context (sibling tiles, sample buildings).
    Context,
}
