//! Per-category publish dimensions and building size classes.
//!
//! Sprites are resized to a fixed pixel size before publishing. Categories
//! without an entry (reference sheets, avatars, scenes) are never resized.

use crate::category::AssetCategory;

/// Target pixel dimensions for a published sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Footprint class of a building, used to size its sprite and to pick
/// sample buildings as auxiliary context for effect overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

/// Building keys with a non-default footprint. Unlisted keys are medium.
const BUILDING_SIZE_CLASSES: &[(&str, SizeClass)] = &[
    ("kiosk", SizeClass::Small),
    ("food_truck", SizeClass::Small),
    ("newsstand", SizeClass::Small),
    ("house", SizeClass::Small),
    ("skyscraper", SizeClass::Large),
    ("factory", SizeClass::Large),
    ("stadium", SizeClass::Large),
    ("mall", SizeClass::Large),
];

/// Classify a building key by footprint.
pub fn building_size_class(asset_key: &str) -> SizeClass {
    BUILDING_SIZE_CLASSES
        .iter()
        .find(|(key, _)| *key == asset_key)
        .map(|(_, class)| *class)
        .unwrap_or(SizeClass::Medium)
}

/// Look up the publish dimensions for a (category, asset_key) pair.
///
/// Returns `None` for categories that are published without resizing.
pub fn target_dimensions(category: AssetCategory, asset_key: &str) -> Option<Dimensions> {
    match category {
        AssetCategory::BuildingSprite => Some(match building_size_class(asset_key) {
            SizeClass::Small => Dimensions::new(128, 128),
            SizeClass::Medium => Dimensions::new(256, 256),
            SizeClass::Large => Dimensions::new(384, 512),
        }),
        AssetCategory::Terrain => Some(Dimensions::new(128, 64)),
        AssetCategory::Npc => Some(Dimensions::new(64, 64)),
        AssetCategory::Effect => Some(Dimensions::new(128, 128)),
        _ => None,
    }
}

/// Pick at most one building key per size class, ordered small, medium,
/// large. Input order decides which key wins within a class.
pub fn sample_per_size_class(building_keys: &[String]) -> Vec<String> {
    let mut picked: Vec<(SizeClass, String)> = Vec::new();
    for key in building_keys {
        let class = building_size_class(key);
        if !picked.iter().any(|(c, _)| *c == class) {
            picked.push((class, key.clone()));
        }
    }
    picked.sort_by_key(|(class, _)| *class);
    picked.into_iter().map(|(_, key)| key).collect()
}
