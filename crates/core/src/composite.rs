//! Content hashing for cached composites.
//!
//! A composite (avatar = stack of layers, scene = template + avatar) is
//! identified by a hash over the sorted, deduplicated set of constituent
//! identifiers. A cached row is valid only while its stored hash equals the
//! hash of the current constituents.

use std::collections::BTreeSet;

use crate::error::CoreError;
use crate::hashing::sha256_hex;

/// The two composite families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Avatar,
    Scene,
}

impl CompositeKind {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "avatar" => Ok(Self::Avatar),
            "scene" => Ok(Self::Scene),
            other => Err(CoreError::Validation(format!(
                "Unknown composite kind '{other}'. Must be one of: avatar, scene"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::Scene => "scene",
        }
    }
}

/// Prefix marking the avatar hash inside a scene's constituents.
pub const AVATAR_HASH_PREFIX: &str = "avatar:";

/// Hash a set of constituent identifiers.
///
/// Order and duplicates do not affect the result; blank entries are ignored.
pub fn composite_hash<S: AsRef<str>>(constituents: &[S]) -> String {
    let set: BTreeSet<&str> = constituents
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|c| !c.is_empty())
        .collect();
    let joined = set.into_iter().collect::<Vec<_>>().join("\n");
    sha256_hex(joined.as_bytes())
}

/// Constituents of a scene composite: the template's layer keys plus the
/// avatar composite hash, so any avatar change changes the scene hash.
pub fn scene_constituents(template_layers: &[String], avatar_hash: &str) -> Vec<String> {
    let mut constituents: Vec<String> = template_layers.to_vec();
    constituents.push(format!("{AVATAR_HASH_PREFIX}{avatar_hash}"));
    constituents
}

/// Validate a constituent list before hashing.
pub fn validate_constituents<S: AsRef<str>>(constituents: &[S]) -> Result<(), CoreError> {
    if constituents.iter().all(|c| c.as_ref().trim().is_empty()) {
        return Err(CoreError::Validation(
            "A composite needs at least one constituent".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_order_and_duplicates() {
        let a = composite_hash(&["layer:12", "layer:7", "layer:3"]);
        let b = composite_hash(&["layer:3", "layer:12", "layer:7", "layer:7"]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_changes_with_any_constituent() {
        let a = composite_hash(&["layer:12", "layer:7"]);
        let b = composite_hash(&["layer:12", "layer:8"]);
        assert_ne!(a, b);
    }

    #[test]
    fn blank_entries_are_ignored() {
        assert_eq!(composite_hash(&["a", " ", ""]), composite_hash(&["a"]));
    }

    #[test]
    fn scene_hash_follows_avatar_hash() {
        let layers = vec!["bg:office".to_string(), "fg:desk".to_string()];
        let s1 = composite_hash(&scene_constituents(&layers, "aaa"));
        let s2 = composite_hash(&scene_constituents(&layers, "bbb"));
        assert_ne!(s1, s2);
    }

    #[test]
    fn kind_names() {
        assert_eq!(CompositeKind::from_name("avatar").unwrap(), CompositeKind::Avatar);
        assert_eq!(CompositeKind::Scene.name(), "scene");
        assert!(CompositeKind::from_name("logo").is_err());
    }

    #[test]
    fn empty_constituents_are_invalid() {
        assert!(validate_constituents::<&str>(&[]).is_err());
        assert!(validate_constituents(&["  "]).is_err());
        assert!(validate_constituents(&["layer:1"]).is_ok());
    }
}
