//! Object-store key naming conventions.
//!
//! | Object                 | Tier    | Key                                            |
//! |------------------------|---------|------------------------------------------------|
//! | reference sheet        | private | `refs/{key}_ref_v{n}.png`                      |
//! | raw generation output  | private | `raw/{category}_{key}_raw_v{n}.png`            |
//! | post-trim image        | private | `processed/{category}/{key}_v{n}_{ts}.png`     |
//! | published sprite       | public  | `sprites/{category}/{key}_v{n}.{webp,png}`     |
//! | resize scratch object  | public  | `tmp/resize/{category}_{key}_v{n}_{nonce}.png` |
//! | avatar composite       | public  | `composites/avatar/{owner}/{hash16}.png`       |
//! | scene composite        | public  | `composites/scene/{owner}/{scope}/{hash16}.png`|

use crate::category::AssetCategory;

/// Format of a published sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishFormat {
    Webp,
    Png,
}

impl PublishFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Png => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Png => "image/png",
        }
    }
}

pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Private key for raw generation output.
///
/// Reference sheets go under `refs/`, everything else under `raw/`.
pub fn raw_key(category: AssetCategory, asset_key: &str, variant: i32) -> String {
    if category.is_reference() {
        format!("refs/{asset_key}_ref_v{variant}.png")
    } else {
        format!("raw/{category}_{asset_key}_raw_v{variant}.png")
    }
}

/// Private key for the background-removed, trimmed image.
pub fn processed_key(category: AssetCategory, asset_key: &str, variant: i32, ts: i64) -> String {
    format!("processed/{category}/{asset_key}_v{variant}_{ts}.png")
}

/// Sibling of a private key with a `_transparent` suffix before the extension.
///
/// Already-transparent keys are returned unchanged so repeated pipeline runs
/// converge on the same object.
pub fn transparent_key(private_key: &str) -> String {
    let (stem, ext) = match private_key.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => (stem, Some(ext)),
        _ => (private_key, None),
    };
    if stem.ends_with("_transparent") {
        return private_key.to_string();
    }
    match ext {
        Some(ext) => format!("{stem}_transparent.{ext}"),
        None => format!("{stem}_transparent"),
    }
}

/// Public key for a published sprite.
pub fn sprite_key(
    category: AssetCategory,
    asset_key: &str,
    variant: i32,
    format: PublishFormat,
) -> String {
    format!(
        "sprites/{category}/{asset_key}_v{variant}.{}",
        format.extension()
    )
}

/// Public scratch key handed to the URL-fetching resize service.
pub fn resize_scratch_key(
    category: AssetCategory,
    asset_key: &str,
    variant: i32,
    nonce: &str,
) -> String {
    format!("tmp/resize/{category}_{asset_key}_v{variant}_{nonce}.png")
}

/// Public key for a cached composite.
///
/// Owner and scope are separate path segments, so callers must reject keys
/// containing `/` (see [`is_path_segment`]).
pub fn composite_key(kind: &str, owner_key: &str, scope_key: &str, content_hash: &str) -> String {
    let short = &content_hash[..content_hash.len().min(16)];
    if scope_key.is_empty() {
        format!("composites/{kind}/{owner_key}/{short}.png")
    } else {
        format!("composites/{kind}/{owner_key}/{scope_key}/{short}.png")
    }
}

/// Whether `value` can stand alone as one segment of an object key.
pub fn is_path_segment(value: &str) -> bool {
    !value.is_empty() && value != "." && value != ".." && !value.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_keys_by_stage() {
        assert_eq!(
            raw_key(AssetCategory::BuildingSprite, "restaurant", 2),
            "raw/building_sprite_restaurant_raw_v2.png"
        );
        assert_eq!(
            raw_key(AssetCategory::CharacterRef, "pedestrian", 1),
            "refs/pedestrian_ref_v1.png"
        );
    }

    #[test]
    fn processed_key_includes_timestamp() {
        assert_eq!(
            processed_key(AssetCategory::Terrain, "road_end", 3, 1700000000),
            "processed/terrain/road_end_v3_1700000000.png"
        );
    }

    #[test]
    fn transparent_key_replaces_suffix() {
        assert_eq!(
            transparent_key("raw/building_sprite_restaurant_raw_v2.png"),
            "raw/building_sprite_restaurant_raw_v2_transparent.png"
        );
    }

    #[test]
    fn transparent_key_is_idempotent() {
        let once = transparent_key("raw/effect_fire_raw_v1.png");
        assert_eq!(transparent_key(&once), once);
    }

    #[test]
    fn transparent_key_without_extension() {
        assert_eq!(transparent_key("raw/blob"), "raw/blob_transparent");
        assert_eq!(transparent_key("raw.d/blob"), "raw.d/blob_transparent");
    }

    #[test]
    fn sprite_key_extension_follows_format() {
        assert_eq!(
            sprite_key(AssetCategory::BuildingSprite, "restaurant", 2, PublishFormat::Webp),
            "sprites/building_sprite/restaurant_v2.webp"
        );
        assert_eq!(
            sprite_key(AssetCategory::BuildingSprite, "restaurant", 2, PublishFormat::Png),
            "sprites/building_sprite/restaurant_v2.png"
        );
    }

    #[test]
    fn composite_keys() {
        let hash = "0123456789abcdef0123456789abcdef";
        assert_eq!(
            composite_key("avatar", "company_7", "", hash),
            "composites/avatar/company_7/0123456789abcdef.png"
        );
        assert_eq!(
            composite_key("scene", "company_7", "office", hash),
            "composites/scene/company_7/office/0123456789abcdef.png"
        );
    }

    #[test]
    fn scene_keys_do_not_collide_across_owner_and_scope() {
        let hash = "0123456789abcdef";
        assert_ne!(
            composite_key("scene", "a_b", "c", hash),
            composite_key("scene", "a", "b_c", hash)
        );
    }

    #[test]
    fn path_segments() {
        assert!(is_path_segment("company_7"));
        assert!(!is_path_segment(""));
        assert!(!is_path_segment(".."));
        assert!(!is_path_segment("a/b"));
    }
}
