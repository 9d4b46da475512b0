//! Media object store
//!
//! Thin read/write wrapper around an `object_store` bucket holding the
//! profile image, the resume and blog images.

use crate::config::{Config, MediaBackend};
use crate::error::AppError;
use axum::http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectMeta, ObjectStore, PutOptions, PutPayload};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Characters left unescaped in a URL path segment (RFC 3986 unreserved)
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Handle to the media bucket
#[derive(Clone)]
pub struct MediaStore {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
    public_base_url: String,
    content_type_attributes: bool,
}

impl MediaStore {
    /// Build the store described by the configuration
    ///
    /// Returns `Ok(None)` when no bucket is configured; media endpoints then
    /// report a configuration error.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AppError> {
        let Some(bucket) = config.media.bucket.clone() else {
            return Ok(None);
        };
        let public_base_url = config.media_public_url();

        let media = match config.media.backend {
            MediaBackend::S3 => {
                let s3 = Arc::new(
                    AmazonS3Builder::from_env()
                        .with_bucket_name(&bucket)
                        .build()?,
                );
                Self {
                    store: s3.clone(),
                    signer: Some(s3),
                    bucket,
                    public_base_url,
                    content_type_attributes: true,
                }
            }
            MediaBackend::Local => {
                std::fs::create_dir_all(&config.media.media_dir).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!(
                        "Failed to create media directory {}: {}",
                        config.media.media_dir,
                        e
                    ))
                })?;
                let local = LocalFileSystem::new_with_prefix(&config.media.media_dir)?;
                Self {
                    store: Arc::new(local),
                    signer: None,
                    bucket,
                    public_base_url,
                    // LocalFileSystem rejects put attributes
                    content_type_attributes: false,
                }
            }
            MediaBackend::Memory => Self::in_memory(&bucket, &public_base_url),
        };

        info!(
            bucket = %media.bucket,
            backend = ?config.media.backend,
            public_url = %media.public_base_url,
            "Media store ready"
        );
        Ok(Some(media))
    }

    /// Wrap an arbitrary object store without URL signing
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        public_base_url: &str,
        content_type_attributes: bool,
    ) -> Self {
        Self {
            store,
            signer: None,
            bucket: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            content_type_attributes,
        }
    }

    /// An in-memory bucket
    pub fn in_memory(bucket: &str, public_base_url: &str) -> Self {
        Self::new(Arc::new(InMemory::new()), bucket, public_base_url, true)
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Write an object, replacing any existing one
    pub async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), AppError> {
        let mut options = PutOptions::default();
        if let (Some(content_type), true) = (content_type, self.content_type_attributes) {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            options.attributes = attributes;
        }

        let size = content.len();
        self.store
            .put_opts(&Path::from(key), PutPayload::from(content), options)
            .await?;

        debug!(bucket = %self.bucket, key, size, "Stored object");
        Ok(())
    }

    /// Object metadata, or `None` if the key does not exist
    pub async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>, AppError> {
        match self.store.head(&Path::from(key)).await {
            Ok(meta) => Ok(Some(meta)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether an object exists
    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.metadata(key).await?.is_some())
    }

    /// Delete an object
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.store.delete(&Path::from(key)).await?;
        debug!(bucket = %self.bucket, key, "Deleted object");
        Ok(())
    }

    /// Time-limited URL granting `method` on one object
    ///
    /// Backends without a signer fall back to the public URL.
    pub async fn signed_url(
        &self,
        method: Method,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, AppError> {
        match &self.signer {
            Some(signer) => {
                let url = signer
                    .signed_url(method, &Path::from(key), expires_in)
                    .await?;
                Ok(url.to_string())
            }
            None => Ok(self.public_url(key)),
        }
    }

    /// Public (unsigned) URL of an object
    pub fn public_url(&self, key: &str) -> String {
        let path = key
            .trim_start_matches('/')
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.public_base_url, path)
    }
}
