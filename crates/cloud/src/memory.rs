//! In-memory backend for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{join_url, validate_key, ObjectStore, StorageError, Tier};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Objects held in a process-local map.
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(Tier, String), StoredObject>>,
    public_base_url: String,
}

impl MemoryObjectStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            public_base_url: public_base_url.into(),
        }
    }

    /// Keys currently stored in a tier, sorted.
    pub fn keys(&self, tier: Tier) -> Vec<String> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(t, _)| *t == tier)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Content type an object was stored with.
    pub fn content_type(&self, tier: Tier, key: &str) -> Option<String> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .get(&(tier, key.to_string()))
            .map(|o| o.content_type.clone())
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://public")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        tier: Tier,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            (tier, key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, tier: Tier, key: &str) -> Result<Vec<u8>, StorageError> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .get(&(tier, key.to_string()))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::NotFound {
                tier,
                key: key.to_string(),
            })
    }

    async fn delete(&self, tier: Tier, key: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.remove(&(tier, key.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}
