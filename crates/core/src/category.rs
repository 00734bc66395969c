//! Asset categories (logical asset families) and their classification.
//!
//! A category decides whether an asset is a reference sheet, a sprite that
//! goes through the post-approval pipeline, or a composite input that is
//! published through other means.

use std::fmt;

use crate::error::CoreError;

/// Logical asset family stored in `generated_assets.category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    BuildingRef,
    CharacterRef,
    EffectRef,
    TerrainRef,
    BuildingSprite,
    Npc,
    Effect,
    Terrain,
    Avatar,
    Scene,
}

/// Every category, in a stable order.
pub const ALL_CATEGORIES: &[AssetCategory] = &[
    AssetCategory::BuildingRef,
    AssetCategory::CharacterRef,
    AssetCategory::EffectRef,
    AssetCategory::TerrainRef,
    AssetCategory::BuildingSprite,
    AssetCategory::Npc,
    AssetCategory::Effect,
    AssetCategory::Terrain,
    AssetCategory::Avatar,
    AssetCategory::Scene,
];

impl AssetCategory {
    /// Parse from the database `category` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown asset category '{name}'")))
    }

    /// Database name value.
    pub fn name(self) -> &'static str {
        match self {
            Self::BuildingRef => "building_ref",
            Self::CharacterRef => "character_ref",
            Self::EffectRef => "effect_ref",
            Self::TerrainRef => "terrain_ref",
            Self::BuildingSprite => "building_sprite",
            Self::Npc => "npc",
            Self::Effect => "effect",
            Self::Terrain => "terrain",
            Self::Avatar => "avatar",
            Self::Scene => "scene",
        }
    }

    /// Reference sheets establish the style for a family of sprites and are
    /// never published to the public tier.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            Self::BuildingRef | Self::CharacterRef | Self::EffectRef | Self::TerrainRef
        )
    }

    /// Sprite-like categories run through the post-approval pipeline and
    /// require an approved reference sheet before generation.
    pub fn is_sprite(self) -> bool {
        matches!(
            self,
            Self::BuildingSprite | Self::Npc | Self::Effect | Self::Terrain
        )
    }

    /// The reference-sheet category a sprite category derives from.
    pub fn reference_category(self) -> Option<Self> {
        match self {
            Self::BuildingSprite => Some(Self::BuildingRef),
            Self::Npc => Some(Self::CharacterRef),
            Self::Effect => Some(Self::EffectRef),
            Self::Terrain => Some(Self::TerrainRef),
            _ => None,
        }
    }

    /// The sprite category whose members a reference sheet implies.
    pub fn sprite_category(self) -> Option<Self> {
        match self {
            Self::BuildingRef => Some(Self::BuildingSprite),
            Self::CharacterRef => Some(Self::Npc),
            Self::EffectRef => Some(Self::Effect),
            Self::TerrainRef => Some(Self::Terrain),
            _ => None,
        }
    }

    /// Object-store stage prefix for raw generation output.
    pub fn stage(self) -> &'static str {
        if self.is_reference() {
            "refs"
        } else {
            "raw"
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validate that `asset_key` is a non-empty lowercase slug (`[a-z0-9_]+`).
pub fn validate_asset_key(asset_key: &str) -> Result<(), CoreError> {
    if asset_key.is_empty() {
        return Err(CoreError::Validation("asset_key is required".into()));
    }
    if !asset_key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "Invalid asset_key '{asset_key}'. Use lowercase letters, digits and underscores"
        )));
    }
    Ok(())
}
