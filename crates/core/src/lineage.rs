//! Parent/child relationships between reference sheets and sprites.
//!
//! Three explicit mappings live here:
//! - [`parent_reference`]: which reference sheet a sprite key derives from.
//! - [`dependent_sprites`]: which sprites an approved reference sheet implies.
//! - [`order_terrain_context`]: how previously approved sibling tiles are
//!   ordered as auxiliary references (master tile first).

use crate::category::AssetCategory;

/// The straight road segment. Once approved it leads the context images of
/// every other road connector so the tile set shares dimensions.
pub const MASTER_ROAD_TILE: &str = "road_straight";

/// Road connector tiles implied by an approved `terrain_ref/road` sheet.
pub const ROAD_TILES: &[&str] = &[
    MASTER_ROAD_TILE,
    "road_corner",
    "road_t_junction",
    "road_crossroad",
    "road_end",
];

/// Walk-cycle directions for character sprites.
pub const WALK_DIRECTIONS: &[&str] = &["n", "e", "s", "w"];

/// Walk-cycle frames per direction.
pub const WALK_FRAMES: u32 = 2;

/// How a sprite's reference sheet is located among approved rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub category: AssetCategory,
    pub key: String,
    /// When true any approved key starting with `key` satisfies the lookup
    /// (e.g. `character_ref/pedestrian*`).
    pub prefix_match: bool,
}

impl ParentRef {
    /// Human-readable `category/key` label used in dependency errors.
    pub fn label(&self) -> String {
        if self.prefix_match {
            format!("{}/{}*", self.category, self.key)
        } else {
            format!("{}/{}", self.category, self.key)
        }
    }

    /// Whether an approved row with `asset_key` satisfies this reference.
    pub fn matches(&self, asset_key: &str) -> bool {
        if self.prefix_match {
            asset_key.starts_with(&self.key)
        } else {
            asset_key == self.key
        }
    }
}

/// Resolve the reference sheet a sprite derives from.
///
/// Total over sprite categories; returns `None` for every other category.
///
/// | Sprite category   | Key example            | Parent                    |
/// |-------------------|------------------------|---------------------------|
/// | `building_sprite` | `restaurant`           | `building_ref/restaurant` |
/// | `npc`             | `pedestrian_walk_s_1`  | `character_ref/pedestrian*` |
/// | `effect`          | `fire`                 | `effect_ref/fire`         |
/// | `terrain`         | `road_corner`          | `terrain_ref/road`        |
pub fn parent_reference(category: AssetCategory, asset_key: &str) -> Option<ParentRef> {
    let reference = category.reference_category()?;
    let parent = match category {
        AssetCategory::Npc => ParentRef {
            category: reference,
            key: family_of(asset_key).to_string(),
            prefix_match: true,
        },
        AssetCategory::Terrain => ParentRef {
            category: reference,
            key: family_of(asset_key).to_string(),
            prefix_match: false,
        },
        _ => ParentRef {
            category: reference,
            key: asset_key.to_string(),
            prefix_match: false,
        },
    };
    Some(parent)
}

/// Leading `_`-separated segment of a key (`pedestrian_walk_s_1` -> `pedestrian`).
fn family_of(asset_key: &str) -> &str {
    asset_key.split('_').next().unwrap_or(asset_key)
}

/// A sprite slot implied by an approved reference sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentSprite {
    pub category: AssetCategory,
    pub asset_key: String,
    pub sprite_variant: Option<String>,
}

/// List the sprites an approved reference sheet implies.
///
/// - `terrain_ref/road` implies the five road connector tiles.
/// - any other `terrain_ref/{k}` implies `terrain/{k}_base`.
/// - `character_ref/{k}` implies one walk-cycle frame per direction and frame.
/// - `building_ref/{k}` and `effect_ref/{k}` imply the single sprite `{k}`.
///
/// Non-reference categories imply nothing.
pub fn dependent_sprites(category: AssetCategory, asset_key: &str) -> Vec<DependentSprite> {
    let Some(sprite_category) = category.sprite_category() else {
        return Vec::new();
    };

    match category {
        AssetCategory::TerrainRef if asset_key == "road" => ROAD_TILES
            .iter()
            .map(|tile| DependentSprite {
                category: sprite_category,
                asset_key: (*tile).to_string(),
                sprite_variant: Some(tile.trim_start_matches("road_").to_string()),
            })
            .collect(),
        AssetCategory::TerrainRef => vec![DependentSprite {
            category: sprite_category,
            asset_key: format!("{asset_key}_base"),
            sprite_variant: Some("base".to_string()),
        }],
        AssetCategory::CharacterRef => {
            let mut sprites = Vec::with_capacity(WALK_DIRECTIONS.len() * WALK_FRAMES as usize);
            for direction in WALK_DIRECTIONS {
                for frame in 1..=WALK_FRAMES {
                    let slot = format!("walk_{direction}_{frame}");
                    sprites.push(DependentSprite {
                        category: sprite_category,
                        asset_key: format!("{asset_key}_{slot}"),
                        sprite_variant: Some(slot),
                    });
                }
            }
            sprites
        }
        _ => vec![DependentSprite {
            category: sprite_category,
            asset_key: asset_key.to_string(),
            sprite_variant: None,
        }],
    }
}

/// Order approved sibling terrain keys for use as auxiliary references.
///
/// The target itself is excluded, the master tile comes first, and the rest
/// keep a stable alphabetical order.
pub fn order_terrain_context(target_key: &str, approved_keys: &[String]) -> Vec<String> {
    let mut siblings: Vec<String> = approved_keys
        .iter()
        .filter(|k| k.as_str() != target_key)
        .cloned()
        .collect();
    siblings.sort();
    siblings.dedup();
    if let Some(pos) = siblings.iter().position(|k| k == MASTER_ROAD_TILE) {
        let master = siblings.remove(pos);
        siblings.insert(0, master);
    }
    siblings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_sprite_parent_is_same_key() {
        let parent = parent_reference(AssetCategory::BuildingSprite, "restaurant").unwrap();
        assert_eq!(parent.category, AssetCategory::BuildingRef);
        assert_eq!(parent.key, "restaurant");
        assert!(!parent.prefix_match);
        assert_eq!(parent.label(), "building_ref/restaurant");
    }

    #[test]
    fn npc_parent_is_prefix_of_character_ref() {
        let parent = parent_reference(AssetCategory::Npc, "pedestrian_walk_s_1").unwrap();
        assert_eq!(parent.category, AssetCategory::CharacterRef);
        assert_eq!(parent.key, "pedestrian");
        assert!(parent.matches("pedestrian"));
        assert!(parent.matches("pedestrian_female"));
        assert!(!parent.matches("car"));
        assert_eq!(parent.label(), "character_ref/pedestrian*");
    }

    #[test]
    fn terrain_parent_is_family() {
        let parent = parent_reference(AssetCategory::Terrain, "road_corner").unwrap();
        assert_eq!(parent.category, AssetCategory::TerrainRef);
        assert_eq!(parent.key, "road");
        assert!(!parent.matches("roadside"));
    }

    #[test]
    fn non_sprites_have_no_parent() {
        assert!(parent_reference(AssetCategory::Scene, "office").is_none());
        assert!(parent_reference(AssetCategory::Avatar, "hat").is_none());
        assert!(parent_reference(AssetCategory::BuildingRef, "restaurant").is_none());
    }

    #[test]
    fn road_sheet_implies_five_connector_tiles() {
        let sprites = dependent_sprites(AssetCategory::TerrainRef, "road");
        assert_eq!(sprites.len(), 5);
        assert!(sprites.iter().all(|s| s.category == AssetCategory::Terrain));
        assert_eq!(sprites[0].asset_key, MASTER_ROAD_TILE);
        assert_eq!(sprites[0].sprite_variant.as_deref(), Some("straight"));
    }

    #[test]
    fn other_terrain_sheet_implies_base_tile() {
        let sprites = dependent_sprites(AssetCategory::TerrainRef, "grass");
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].asset_key, "grass_base");
    }

    #[test]
    fn character_sheet_implies_walk_cycle() {
        let sprites = dependent_sprites(AssetCategory::CharacterRef, "pedestrian");
        assert_eq!(sprites.len(), WALK_DIRECTIONS.len() * WALK_FRAMES as usize);
        assert!(sprites.iter().any(|s| s.asset_key == "pedestrian_walk_s_2"));
        // Every implied frame resolves back to the sheet that implied it.
        for sprite in &sprites {
            let parent = parent_reference(sprite.category, &sprite.asset_key).unwrap();
            assert!(parent.matches("pedestrian"));
        }
    }

    #[test]
    fn building_sheet_implies_single_sprite() {
        let sprites = dependent_sprites(AssetCategory::BuildingRef, "restaurant");
        assert_eq!(
            sprites,
            vec![DependentSprite {
                category: AssetCategory::BuildingSprite,
                asset_key: "restaurant".into(),
                sprite_variant: None,
            }]
        );
    }

    #[test]
    fn sprites_imply_nothing() {
        assert!(dependent_sprites(AssetCategory::Terrain, "road_corner").is_empty());
    }

    #[test]
    fn terrain_context_puts_master_first() {
        let approved = vec![
            "road_end".to_string(),
            "road_corner".to_string(),
            MASTER_ROAD_TILE.to_string(),
            "road_t_junction".to_string(),
        ];
        let ordered = order_terrain_context("road_t_junction", &approved);
        assert_eq!(ordered, vec![MASTER_ROAD_TILE, "road_corner", "road_end"]);
    }
}
