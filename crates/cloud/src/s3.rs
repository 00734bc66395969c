//! S3 (or S3-compatible) backend with one bucket per tier.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::config::StorageConfig;
use crate::{join_url, validate_key, ObjectStore, StorageError, Tier};

pub struct S3ObjectStore {
    client: Client,
    private_bucket: String,
    public_bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain, with the
    /// configured region and optional custom endpoint.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        tracing::info!(
            private_bucket = %config.private_bucket,
            public_bucket = %config.public_bucket,
            "S3 object store initialized"
        );

        Self {
            client: Client::from_conf(s3_config),
            private_bucket: config.private_bucket.clone(),
            public_bucket: config.public_bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    fn bucket(&self, tier: Tier) -> &str {
        match tier {
            Tier::Private => &self.private_bucket,
            Tier::Public => &self.public_bucket,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        tier: Tier,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(self.bucket(tier))
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(tier = %tier, key, error = ?e, "S3 PUT failed");
                StorageError::Backend(format!("PUT {tier}/{key}: {e}"))
            })?;
        Ok(())
    }

    async fn get(&self, tier: Tier, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(self.bucket(tier))
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound {
                        tier,
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Backend(format!("GET {tier}/{key}: {service_error}"))
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to read body of {tier}/{key}: {e}")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, tier: Tier, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.client
            .delete_object()
            .bucket(self.bucket(tier))
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("DELETE {tier}/{key}: {e}")))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}
