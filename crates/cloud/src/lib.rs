//! Two-tier object storage.
//!
//! The private tier holds originals and intermediate artifacts; the public
//! tier holds CDN-served published assets. Each backend addresses both
//! tiers independently by key.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub mod config;
pub mod local;
pub mod memory;
pub mod s3;

pub use config::{StorageBackendKind, StorageConfig};
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Visibility tier of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Private,
    Public,
}

impl Tier {
    pub fn name(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {tier}/{key}")]
    NotFound { tier: Tier, key: String },

    #[error("Invalid object key '{0}'")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Key/bytes blob storage with a private and a public tier.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write (or overwrite) an object.
    async fn put(
        &self,
        tier: Tier,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Read an object. Missing objects are [`StorageError::NotFound`].
    async fn get(&self, tier: Tier, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, tier: Tier, key: &str) -> Result<(), StorageError>;

    /// Publicly fetchable URL of a public-tier key.
    fn public_url(&self, key: &str) -> String;
}

/// Reject keys that could escape a backend's namespace.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|segment| segment == ".." || segment.is_empty())
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Join a base URL and a key with exactly one slash.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

/// Build the configured backend.
pub async fn build_object_store(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config.backend {
        StorageBackendKind::S3 => Arc::new(S3ObjectStore::from_config(config).await),
        StorageBackendKind::Local => Arc::new(LocalObjectStore::new(
            config.local_root.clone(),
            config.public_base_url.clone(),
        )),
        StorageBackendKind::Memory => {
            Arc::new(MemoryObjectStore::new(config.public_base_url.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_validated() {
        assert!(validate_key("sprites/building_sprite/restaurant_v2.webp").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("raw/../secret").is_err());
        assert!(validate_key("raw//double").is_err());
    }

    #[test]
    fn urls_join_with_single_slash() {
        assert_eq!(join_url("https://cdn.example/", "/sprites/a.png"), "https://cdn.example/sprites/a.png");
        assert_eq!(join_url("https://cdn.example", "sprites/a.png"), "https://cdn.example/sprites/a.png");
    }
}
