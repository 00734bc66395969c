//! Dependency gates and reference-image assembly for a generation.
//!
//! Everything here only reads: the record store and the private tier. No
//! row is written and no remote service is called, so a failed gate leaves
//! no trace.

use std::collections::HashSet;

use assetforge_cloud::{StorageError, Tier};
use assetforge_core::category::AssetCategory;
use assetforge_core::lineage::{order_terrain_context, parent_reference};
use assetforge_core::references::ReferenceSpec;
use assetforge_core::sizing::sample_per_size_class;
use assetforge_core::storage_keys::PNG_CONTENT_TYPE;
use assetforge_core::types::DbId;
use assetforge_db::models::generated_asset::GeneratedAsset;
use assetforge_db::models::status::AssetStatus;
use assetforge_imaging::ReferenceImage;

use crate::error::PipelineError;
use crate::services::Services;

/// The reference images for one generation, in priority order, plus the
/// resolved parent reference sheet.
#[derive(Debug, Default)]
pub(crate) struct Assembled {
    pub parent: Option<GeneratedAsset>,
    pub images: Vec<ReferenceImage>,
}

/// Check the dependency gate for `(category, asset_key)` and return the
/// approved parent reference sheet, if the category has one.
pub(crate) async fn check_dependencies(
    services: &Services,
    category: AssetCategory,
    asset_key: &str,
) -> Result<Option<GeneratedAsset>, PipelineError> {
    let mut missing = Vec::new();
    let mut parent = None;

    if let Some(parent_ref) = parent_reference(category, asset_key) {
        let approved = services
            .store
            .list_approved(parent_ref.category.name())
            .await?;
        // Rows are grouped by key with the active version first.
        parent = approved.into_iter().find(|a| parent_ref.matches(&a.asset_key));
        if parent.is_none() {
            missing.push(parent_ref.label());
        }
    }

    if category == AssetCategory::Scene {
        let avatars = services
            .store
            .list_approved(AssetCategory::Avatar.name())
            .await?;
        if avatars.is_empty() {
            missing.push(format!("{}/*", AssetCategory::Avatar));
        }
    }

    if !missing.is_empty() {
        return Err(PipelineError::DependencyNotMet { missing });
    }
    Ok(parent)
}

/// Run the dependency gate and load every reference image.
///
/// Order: user references, then the parent sheet, then category context.
pub(crate) async fn assemble(
    services: &Services,
    category: AssetCategory,
    asset_key: &str,
    specs: &[ReferenceSpec],
) -> Result<Assembled, PipelineError> {
    let parent = check_dependencies(services, category, asset_key).await?;

    let mut images = Vec::new();
    let mut used: HashSet<DbId> = HashSet::new();

    for spec in specs {
        match spec {
            ReferenceSpec::Library { key } => {
                let object_key = ReferenceSpec::library_object_key(key);
                let bytes = services
                    .objects
                    .get(Tier::Private, &object_key)
                    .await
                    .map_err(|e| match e {
                        StorageError::NotFound { .. } => PipelineError::Validation(format!(
                            "Reference image '{object_key}' not found"
                        )),
                        other => other.into(),
                    })?;
                images.push(ReferenceImage {
                    label: format!("library/{key}"),
                    bytes,
                    content_type: PNG_CONTENT_TYPE.into(),
                });
            }
            ReferenceSpec::Asset { asset_id } => {
                let asset = services
                    .store
                    .find_asset(*asset_id)
                    .await?
                    .ok_or_else(|| PipelineError::asset_not_found(*asset_id))?;
                if asset.status() != AssetStatus::Approved {
                    return Err(PipelineError::ReferenceNotApproved {
                        asset_id: *asset_id,
                    });
                }
                if used.insert(asset.id) {
                    images.push(load_asset_image(services, &asset).await?);
                }
            }
        }
    }

    if let Some(parent) = &parent {
        if used.insert(parent.id) {
            images.push(load_asset_image(services, parent).await?);
        }
    }

    for row in context_rows(services, category, asset_key).await? {
        if !used.insert(row.id) {
            continue;
        }
        match load_asset_image(services, &row).await {
            Ok(image) => images.push(image),
            Err(e) => tracing::warn!(
                asset_id = row.id,
                error = %e,
                "Skipping unreadable context reference"
            ),
        }
    }

    Ok(Assembled { parent, images })
}

/// Category-specific auxiliary references.
///
/// - terrain: approved sibling tiles, master road tile first.
/// - effect: one approved building sprite per size class.
async fn context_rows(
    services: &Services,
    category: AssetCategory,
    asset_key: &str,
) -> Result<Vec<GeneratedAsset>, PipelineError> {
    let limit = services.config.max_context_references;
    let (approved, keys) = match category {
        AssetCategory::Terrain => {
            let approved = services.store.list_approved(category.name()).await?;
            let keys: Vec<String> = approved.iter().map(|a| a.asset_key.clone()).collect();
            let ordered = order_terrain_context(asset_key, &keys);
            (approved, ordered)
        }
        AssetCategory::Effect => {
            let approved = services
                .store
                .list_approved(AssetCategory::BuildingSprite.name())
                .await?;
            let mut keys: Vec<String> = approved.iter().map(|a| a.asset_key.clone()).collect();
            keys.dedup();
            (approved, sample_per_size_class(&keys))
        }
        _ => return Ok(Vec::new()),
    };

    let rows = keys
        .iter()
        .take(limit)
        .filter_map(|key| approved.iter().find(|a| &a.asset_key == key).cloned())
        .collect();
    Ok(rows)
}

/// Read the current private image of an approved asset.
async fn load_asset_image(
    services: &Services,
    asset: &GeneratedAsset,
) -> Result<ReferenceImage, PipelineError> {
    let key = asset.private_key.as_deref().ok_or_else(|| {
        PipelineError::Validation(format!(
            "Reference asset {} has no stored image",
            asset.id
        ))
    })?;
    let bytes = services.objects.get(Tier::Private, key).await?;
    Ok(ReferenceImage {
        label: format!("{}/{}#{}", asset.category, asset.asset_key, asset.id),
        bytes,
        content_type: PNG_CONTENT_TYPE.into(),
    })
}
