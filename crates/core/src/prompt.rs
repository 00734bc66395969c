//! Prompt template library and rejection-feedback injection.
//!
//! Templates are looked up strictly: a missing entry is an error, never a
//! silent default, so no generation call is spent on a wrong prompt. A
//! library may declare a per-category entry under the key `*`; that entry
//! is data, not a hardcoded fallback.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::category::AssetCategory;

/// Key under which a category-wide template may be declared.
pub const CATEGORY_WILDCARD: &str = "*";

/// Header of the feedback block appended to a rejected prompt.
pub const FEEDBACK_HEADER: &str = "IMPORTANT - the previous attempt was rejected. Fix this:";

/// No template exists for the requested (category, asset_key).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No prompt template for {category}/{asset_key}")]
pub struct MissingTemplate {
    pub category: String,
    pub asset_key: String,
}

/// Failure to load a template library file.
#[derive(Debug, thiserror::Error)]
pub enum LibraryLoadError {
    #[error("Failed to read prompt library: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse prompt library: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk shape: `{ "building_sprite": { "restaurant": "...", "*": "..." } }`.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct LibraryFile(HashMap<String, HashMap<String, String>>);

/// Prompt templates keyed by category, then asset key.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    templates: HashMap<String, HashMap<String, String>>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. `asset_key` may be [`CATEGORY_WILDCARD`].
    pub fn insert(
        &mut self,
        category: AssetCategory,
        asset_key: impl Into<String>,
        template: impl Into<String>,
    ) {
        self.templates
            .entry(category.name().to_string())
            .or_default()
            .insert(asset_key.into(), template.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(
        mut self,
        category: AssetCategory,
        asset_key: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.insert(category, asset_key, template);
        self
    }

    /// Parse a library from JSON text.
    pub fn from_json(json: &str) -> Result<Self, LibraryLoadError> {
        let file: LibraryFile = serde_json::from_str(json)?;
        Ok(Self { templates: file.0 })
    }

    /// Load a library from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LibraryLoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Number of templates across all categories.
    pub fn len(&self) -> usize {
        self.templates.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the template for an asset.
    ///
    /// Tries the exact key, then the category's `*` entry. `{asset_key}` in
    /// the template is replaced by the key with underscores as spaces.
    pub fn resolve(
        &self,
        category: AssetCategory,
        asset_key: &str,
    ) -> Result<String, MissingTemplate> {
        let entries = self.templates.get(category.name());
        let template = entries
            .and_then(|e| e.get(asset_key).or_else(|| e.get(CATEGORY_WILDCARD)))
            .ok_or_else(|| MissingTemplate {
                category: category.name().to_string(),
                asset_key: asset_key.to_string(),
            })?;
        Ok(template.replace("{asset_key}", &asset_key.replace('_', " ")))
    }
}

/// Build the prompt used after a rejection: the base prompt followed by a
/// feedback block quoting `reason` verbatim.
pub fn with_feedback(base_prompt: &str, reason: &str) -> String {
    format!(
        "{}\n\n{FEEDBACK_HEADER}\n\"{}\"",
        base_prompt.trim_end(),
        reason.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> PromptLibrary {
        PromptLibrary::new()
            .with(
                AssetCategory::BuildingSprite,
                "restaurant",
                "Isometric restaurant with a red awning",
            )
            .with(
                AssetCategory::Terrain,
                CATEGORY_WILDCARD,
                "Seamless isometric {asset_key} tile",
            )
    }

    #[test]
    fn exact_key_resolves() {
        assert_eq!(
            library()
                .resolve(AssetCategory::BuildingSprite, "restaurant")
                .unwrap(),
            "Isometric restaurant with a red awning"
        );
    }

    #[test]
    fn category_entry_resolves_with_key_substitution() {
        assert_eq!(
            library().resolve(AssetCategory::Terrain, "road_corner").unwrap(),
            "Seamless isometric road corner tile"
        );
    }

    #[test]
    fn missing_template_is_an_error() {
        let err = library()
            .resolve(AssetCategory::BuildingSprite, "bakery")
            .unwrap_err();
        assert_eq!(err.category, "building_sprite");
        assert_eq!(err.asset_key, "bakery");

        assert!(library().resolve(AssetCategory::Npc, "pedestrian_walk_n_1").is_err());
    }

    #[test]
    fn loads_from_json() {
        let lib = PromptLibrary::from_json(
            r#"{ "effect": { "fire": "Flickering flames", "*": "Generic effect" } }"#,
        )
        .unwrap();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.resolve(AssetCategory::Effect, "fire").unwrap(), "Flickering flames");
        assert_eq!(lib.resolve(AssetCategory::Effect, "smoke").unwrap(), "Generic effect");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{ "scene": { "office": "Open-plan office" } }"#).unwrap();
        let lib = PromptLibrary::load(&path).unwrap();
        assert!(!lib.is_empty());
        assert!(PromptLibrary::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(PromptLibrary::from_json("[1, 2, 3]").is_err());
    }

    #[test]
    fn feedback_quotes_reason_verbatim() {
        let prompt = with_feedback("Isometric restaurant", "door too small");
        assert!(prompt.starts_with("Isometric restaurant\n\n"));
        assert!(prompt.contains(FEEDBACK_HEADER));
        assert!(prompt.contains("\"door too small\""));
    }

    #[test]
    fn feedback_is_built_from_base_not_accumulated() {
        let first = with_feedback("Base", "too dark");
        let second = with_feedback("Base", "too bright");
        assert!(!second.contains("too dark"));
        assert_ne!(first, second);
    }
}
