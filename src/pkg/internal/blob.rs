use std::path::PathBuf;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Builder, Credentials, Region},
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};

use crate::prelude::{AppError, Result};

/// Where uploaded file contents live. Keys look like `photo/<uuid>.png`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
    /// Removing a key that does not exist is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

pub struct LocalBlobs {
    root: PathBuf,
}

impl LocalBlobs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalBlobs { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobs {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.root.join(key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("stored blob at {}", path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct S3Settings<'a> {
    pub bucket: &'a str,
    pub endpoint: &'a str,
    pub region: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
}

/// S3 or any S3-compatible service such as minio.
pub struct S3Blobs {
    client: Client,
    bucket: String,
}

impl S3Blobs {
    pub async fn connect(conf: S3Settings<'_>) -> Result<Self> {
        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(conf.region.to_string()))
            .credentials_provider(Credentials::new(
                conf.access_key,
                conf.secret_key,
                None,
                None,
                "static",
            ))
            .force_path_style(true);
        if !conf.endpoint.is_empty() {
            builder = builder.endpoint_url(conf.endpoint);
        }
        let blobs = S3Blobs {
            client: Client::from_conf(builder.build()),
            bucket: conf.bucket.to_string(),
        };
        blobs.ensure_bucket(conf.region).await?;
        Ok(blobs)
    }

    async fn ensure_bucket(&self, region: &str) -> Result<()> {
        let mut create = self.client.create_bucket().bucket(&self.bucket);
        // us-east-1 is the implicit default and must not be named
        if region != "us-east-1" {
            let cfg = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            create = create.create_bucket_configuration(cfg);
        }
        match create.send().await {
            Ok(_) => {
                tracing::info!("created bucket {}", self.bucket);
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .map(|se| se.is_bucket_already_exists() || se.is_bucket_already_owned_by_you())
                    == Some(true) =>
            {
                Ok(())
            }
            Err(err) => Err(AppError::internal("failed to prepare upload bucket", err)),
        }
    }
}

#[async_trait]
impl BlobStore for S3Blobs {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::internal("failed to store file", e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::internal("failed to remove file", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BlobStore, LocalBlobs};

    #[tokio::test]
    async fn local_blobs_write_and_forget() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobs::new(dir.path());
        blobs.put("photo/a.png", vec![1, 2, 3], "image/png").await.unwrap();
        let stored = tokio::fs::read(dir.path().join("photo/a.png")).await.unwrap();
        assert_eq!(stored, vec![1, 2, 3]);

        blobs.remove("photo/a.png").await.unwrap();
        assert!(!dir.path().join("photo/a.png").exists());
        blobs.remove("photo/a.png").await.unwrap();
    }
}
