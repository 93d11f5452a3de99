//! S3-compatible object storage client for published renders and thumbnails.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
    /// Public-facing base URL objects are served from (a CDN or the
    /// bucket's public endpoint), used to build the URLs written back to
    /// the job/project records rather than a presigned one that expires.
    pub public_base_url: String,
}

impl ObjectStoreConfig {
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("RENDER_STORAGE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("RENDER_STORAGE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("RENDER_STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("RENDER_STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("RENDER_STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("RENDER_STORAGE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("RENDER_STORAGE_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("RENDER_STORAGE_BUCKET_NAME not set"))?,
            region: std::env::var("RENDER_STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("RENDER_STORAGE_PUBLIC_BASE_URL")
                .map_err(|_| StorageError::config_error("RENDER_STORAGE_PUBLIC_BASE_URL not set"))?,
        })
    }
}

/// Thin wrapper over the S3 SDK client, scoped to one bucket.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl ObjectStore {
    pub fn new(config: ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(&config.access_key_id, &config.secret_access_key, None, None, "render-storage");

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url,
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(ObjectStoreConfig::from_env()?))
    }

    pub async fn upload_file(&self, path: impl AsRef<Path>, key: &str, content_type: &str) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path).await.map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("uploaded {} to {}", path.display(), key);
        Ok(())
    }

    pub async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<()> {
        debug!("uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let response = self.client.get_object().bucket(&self.bucket).key(key).send().await.map_err(|e| {
            if e.to_string().contains("NoSuchKey") {
                StorageError::not_found(key)
            } else {
                StorageError::DownloadFailed(e.to_string())
            }
        })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    pub async fn download_file(&self, key: &str, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        let bytes = self.download_bytes(key).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// Builds the permanent public URL for an object under the configured
    /// base (a CDN or the bucket's public endpoint). Unlike `presign_get`
    /// this never expires, which is what a finished render's output and
    /// thumbnail URLs need once written to a job/project record.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    /// Used by the `/health` readiness check: a cheap head-bucket round trip.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("connectivity check failed: {e}")))?;
        Ok(())
    }
}
