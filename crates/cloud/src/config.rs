use std::path::PathBuf;

/// Which [`ObjectStore`](crate::ObjectStore) implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    S3,
    Local,
    Memory,
}

impl StorageBackendKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "s3" => Some(Self::S3),
            "local" => Some(Self::Local),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Object storage configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub private_bucket: String,
    pub public_bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2).
    pub endpoint: Option<String>,
    pub local_root: PathBuf,
    /// Base URL public-tier keys are served under.
    pub public_base_url: String,
}

impl StorageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                          |
    /// |----------------------|----------------------------------|
    /// | `STORAGE_BACKEND`    | `local`                          |
    /// | `S3_PRIVATE_BUCKET`  | `assetforge-private`             |
    /// | `S3_PUBLIC_BUCKET`   | `assetforge-public`              |
    /// | `S3_REGION`          | `us-east-1`                      |
    /// | `S3_ENDPOINT`        | unset                            |
    /// | `LOCAL_STORAGE_ROOT` | `./storage`                      |
    /// | `PUBLIC_BASE_URL`    | `http://localhost:3000/public`   |
    pub fn from_env() -> Self {
        let backend_name = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        let backend = StorageBackendKind::from_name(&backend_name)
            .expect("STORAGE_BACKEND must be one of: s3, local, memory");

        Self {
            backend,
            private_bucket: std::env::var("S3_PRIVATE_BUCKET")
                .unwrap_or_else(|_| "assetforge-private".into()),
            public_bucket: std::env::var("S3_PUBLIC_BUCKET")
                .unwrap_or_else(|_| "assetforge-public".into()),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: std::env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            local_root: std::env::var("LOCAL_STORAGE_ROOT")
                .unwrap_or_else(|_| "./storage".into())
                .into(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/public".into()),
        }
    }

    /// In-memory configuration for tests.
    pub fn memory() -> Self {
        Self {
            backend: StorageBackendKind::Memory,
            private_bucket: String::new(),
            public_bucket: String::new(),
            region: String::new(),
            endpoint: None,
            local_root: PathBuf::new(),
            public_base_url: "memory://public".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!(StorageBackendKind::from_name("s3"), Some(StorageBackendKind::S3));
        assert_eq!(StorageBackendKind::from_name("memory"), Some(StorageBackendKind::Memory));
        assert_eq!(StorageBackendKind::from_name("ftp"), None);
    }
}
