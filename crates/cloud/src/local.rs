//! Filesystem backend: `{root}/private/{key}` and `{root}/public/{key}`.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{join_url, validate_key, ObjectStore, StorageError, Tier};

pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Directory holding the public tier, for serving it statically.
    pub fn public_root(&self) -> PathBuf {
        self.root.join(Tier::Public.name())
    }

    fn path_for(&self, tier: Tier, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(tier.name()).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        tier: Tier,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.path_for(tier, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(tier = %tier, key, "Stored object");
        Ok(())
    }

    async fn get(&self, tier: Tier, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(tier, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                tier,
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, tier: Tier, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(tier, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}
