//! Composite Cache.
//!
//! Avatars (a stack of layers) and scenes (a template plus an avatar) are
//! composited outside this crate. The cache only decides whether a stored
//! composite is still valid: a row is a hit iff its stored hash equals the
//! hash of the current constituents. Rebuilding an owner's avatar with a new
//! hash also deletes every scene cached for that owner.

use std::future::Future;

use assetforge_cloud::Tier;
use assetforge_core::composite::{composite_hash, validate_constituents, CompositeKind};
use assetforge_core::storage_keys::{composite_key, is_path_segment, PNG_CONTENT_TYPE};
use assetforge_db::models::audit::CreateAuditEntry;
use assetforge_db::models::composite::{CompositeCacheEntry, UpsertCompositeCacheEntry};
use assetforge_events::AssetEvent;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

pub use assetforge_core::composite::scene_constituents;

use crate::audit;
use crate::error::PipelineError;
use crate::services::Services;

/// Identity of a cached composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeRef {
    pub kind: CompositeKind,
    /// Entity the composite belongs to, e.g. `company_7`.
    pub owner_key: String,
    /// Scene template key; empty for avatars.
    pub scope_key: String,
}

impl CompositeRef {
    pub fn avatar(owner_key: impl Into<String>) -> Self {
        Self {
            kind: CompositeKind::Avatar,
            owner_key: owner_key.into(),
            scope_key: String::new(),
        }
    }

    pub fn scene(owner_key: impl Into<String>, template_key: impl Into<String>) -> Self {
        Self {
            kind: CompositeKind::Scene,
            owner_key: owner_key.into(),
            scope_key: template_key.into(),
        }
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.owner_key.trim().is_empty() {
            return Err(PipelineError::Validation("owner_key is required".into()));
        }
        if !is_path_segment(&self.owner_key)
            || (!self.scope_key.is_empty() && !is_path_segment(&self.scope_key))
        {
            return Err(PipelineError::Validation(
                "owner_key and scope_key must not contain '/' or be '.' or '..'".into(),
            ));
        }
        match self.kind {
            CompositeKind::Scene if self.scope_key.trim().is_empty() => Err(
                PipelineError::Validation("A scene composite needs a template key".into()),
            ),
            CompositeKind::Avatar if !self.scope_key.is_empty() => Err(
                PipelineError::Validation("An avatar composite has no template key".into()),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeLookup {
    pub cached: bool,
    /// Set on a hit, and after a composite has been stored.
    pub url: Option<String>,
    pub content_hash: String,
}

pub struct CompositeCache {
    services: Services,
}

impl CompositeCache {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Check whether a valid composite exists for `constituents`.
    pub async fn lookup<S: AsRef<str>>(
        &self,
        target: &CompositeRef,
        constituents: &[S],
    ) -> Result<CompositeLookup, PipelineError> {
        target.validate()?;
        validate_constituents(constituents)?;
        let content_hash = composite_hash(constituents);

        let entry = self
            .services
            .store
            .find_composite(target.kind.name(), &target.owner_key, &target.scope_key)
            .await?;

        match entry {
            Some(entry) if entry.content_hash == content_hash => {
                self.services.store.touch_composite(entry.id).await?;
                tracing::debug!(
                    kind = target.kind.name(),
                    owner_key = %target.owner_key,
                    "Composite cache hit"
                );
                Ok(CompositeLookup {
                    cached: true,
                    url: Some(entry.public_url),
                    content_hash,
                })
            }
            _ => Ok(CompositeLookup {
                cached: false,
                url: None,
                content_hash,
            }),
        }
    }

    /// Return the cached composite, or call `build` for fresh bytes and
    /// store them.
    pub async fn get_or_build<S, F, Fut>(
        &self,
        target: &CompositeRef,
        constituents: &[S],
        actor: &str,
        build: F,
    ) -> Result<CompositeLookup, PipelineError>
    where
        S: AsRef<str>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, PipelineError>>,
    {
        let lookup = self.lookup(target, constituents).await?;
        if lookup.cached {
            return Ok(lookup);
        }
        let bytes = build().await?;
        self.store(target, constituents, bytes, actor).await
    }

    /// Store freshly composited bytes under a hash-derived public key.
    pub async fn store<S: AsRef<str>>(
        &self,
        target: &CompositeRef,
        constituents: &[S],
        bytes: Vec<u8>,
        actor: &str,
    ) -> Result<CompositeLookup, PipelineError> {
        target.validate()?;
        validate_constituents(constituents)?;
        if bytes.is_empty() {
            return Err(PipelineError::Validation("Composite image is empty".into()));
        }

        let store = &self.services.store;
        let objects = &self.services.objects;
        let kind = target.kind.name();
        let content_hash = composite_hash(constituents);

        let previous = store
            .find_composite(kind, &target.owner_key, &target.scope_key)
            .await?;

        let key = composite_key(kind, &target.owner_key, &target.scope_key, &content_hash);
        objects
            .put(Tier::Public, &key, bytes, PNG_CONTENT_TYPE)
            .await?;
        let public_url = objects.public_url(&key);

        let entry = store
            .upsert_composite(&UpsertCompositeCacheEntry {
                kind: kind.to_string(),
                owner_key: target.owner_key.clone(),
                scope_key: target.scope_key.clone(),
                content_hash: content_hash.clone(),
                storage_key: key.clone(),
                public_url: public_url.clone(),
            })
            .await?;

        if let Some(previous) = &previous {
            if previous.storage_key != key {
                self.delete_object(&previous.storage_key).await;
            }
        }

        tracing::info!(
            kind,
            owner_key = %entry.owner_key,
            scope_key = %entry.scope_key,
            content_hash = %content_hash,
            "Composite stored"
        );
        self.services.events.publish(AssetEvent::CompositeStored {
            kind: kind.to_string(),
            owner_key: entry.owner_key.clone(),
            scope_key: entry.scope_key.clone(),
            content_hash: content_hash.clone(),
        });
        audit::record(
            store.as_ref(),
            CreateAuditEntry::composite(
                actor,
                "composite_stored",
                Some(entry.id),
                json!({
                    "kind": kind,
                    "owner_key": entry.owner_key,
                    "scope_key": entry.scope_key,
                    "content_hash": content_hash,
                    "storage_key": key,
                    "replaced_hash": previous.as_ref().map(|p| p.content_hash.clone()),
                }),
            ),
        )
        .await;

        let avatar_changed = target.kind == CompositeKind::Avatar
            && previous.as_ref().map(|p| p.content_hash.as_str()) != Some(content_hash.as_str());
        if avatar_changed {
            self.invalidate_owner(&target.owner_key, actor).await?;
        }

        Ok(CompositeLookup {
            cached: false,
            url: Some(public_url),
            content_hash,
        })
    }

    /// Delete every scene composite of `owner_key`. Returns how many rows
    /// were removed.
    pub async fn invalidate_owner(
        &self,
        owner_key: &str,
        actor: &str,
    ) -> Result<usize, PipelineError> {
        let store = &self.services.store;
        let removed = store
            .delete_composites_by_owner(CompositeKind::Scene.name(), owner_key)
            .await?;
        self.delete_objects(&removed).await;

        if !removed.is_empty() {
            tracing::info!(owner_key, removed = removed.len(), "Scene composites invalidated");
            audit::record(
                store.as_ref(),
                CreateAuditEntry::composite(
                    actor,
                    "composites_invalidated",
                    None,
                    json!({
                        "owner_key": owner_key,
                        "removed": removed_summary(&removed),
                    }),
                ),
            )
            .await;
        }
        self.services.events.publish(AssetEvent::CompositesInvalidated {
            owner_key: owner_key.to_string(),
            removed: removed.len(),
        });
        Ok(removed.len())
    }

    /// Delete composites not read since `now - older_than`, rows and
    /// objects. Returns how many were removed.
    pub async fn evict_stale(
        &self,
        older_than: chrono::Duration,
        actor: &str,
    ) -> Result<usize, PipelineError> {
        let cutoff = Utc::now() - older_than;
        let store = &self.services.store;
        let removed = store.delete_composites_not_accessed_since(cutoff).await?;
        self.delete_objects(&removed).await;
        if !removed.is_empty() {
            tracing::info!(removed = removed.len(), %cutoff, "Stale composites evicted");
            audit::record(
                store.as_ref(),
                CreateAuditEntry::composite(
                    actor,
                    "composites_evicted",
                    None,
                    json!({
                        "cutoff": cutoff,
                        "removed": removed_summary(&removed),
                    }),
                ),
            )
            .await;
        }
        Ok(removed.len())
    }

    async fn delete_objects(&self, entries: &[CompositeCacheEntry]) {
        for entry in entries {
            self.delete_object(&entry.storage_key).await;
        }
    }

    async fn delete_object(&self, key: &str) {
        if let Err(e) = self.services.objects.delete(Tier::Public, key).await {
            tracing::warn!(key, error = %e, "Failed to delete composite object");
        }
    }
}

fn removed_summary(entries: &[CompositeCacheEntry]) -> Vec<serde_json::Value> {
    entries
        .iter()
        .map(|e| {
            json!({
                "id": e.id,
                "kind": e.kind,
                "owner_key": e.owner_key,
                "scope_key": e.scope_key,
                "content_hash": e.content_hash,
            })
        })
        .collect()
}
