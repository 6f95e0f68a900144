//! Object-storage backend.
//!
//! Each blob is one object keyed by its name; the content-type travels as
//! the object's standard `Content-Type` attribute. The `object_store` client
//! is async, so every store owns a current-thread tokio runtime and blocks
//! on it. Calling these methods from inside another tokio runtime panics.
//!
//! Uploads stream through a multipart upload once content passes the
//! threshold. Reads are fully buffered: `get` fetches the whole object into
//! memory before handing back a reader.

use crate::error::{BlobError, Result};
use crate::store::BlobStore;
use crate::types::{validate_name, Blob};
use bytes::Buf;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ObjectStore, PutMultipartOpts, PutOptions, PutPayload, WriteMultipart,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

/// Region used when an S3 configuration does not name one.
const DEFAULT_REGION: &str = "us-east-1";

/// Smallest part S3 accepts for all but the last part of a multipart upload.
const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Parts allowed in flight before reading more content.
const MAX_CONCURRENT_PARTS: usize = 4;

/// Read buffer for streaming multipart uploads.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Where the objects live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// S3 or an S3-compatible service such as MinIO.
    S3 {
        /// Custom endpoint, e.g. `http://localhost:9000`. AWS when unset.
        #[serde(default)]
        endpoint: Option<String>,
        access_key: String,
        secret_key: String,
        bucket: String,
        /// Defaults to `us-east-1`.
        #[serde(default)]
        region: Option<String>,
    },

    /// Process-local bucket, lost on drop.
    Memory,
}

impl ObjectStoreConfig {
    /// Short backend label used in logs, `"s3"` or `"memory"`.
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectStoreConfig::S3 { .. } => "s3",
            ObjectStoreConfig::Memory => "memory",
        }
    }
}

/// Configuration of a [`BucketStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub store: ObjectStoreConfig,

    /// Content larger than this is uploaded with a multipart upload.
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: usize,
}

fn default_multipart_threshold() -> usize {
    BucketConfig::DEFAULT_MULTIPART_THRESHOLD
}

impl BucketConfig {
    pub const DEFAULT_MULTIPART_THRESHOLD: usize = 8 * 1024 * 1024;

    /// In-memory bucket with default settings.
    pub fn memory() -> Self {
        Self {
            store: ObjectStoreConfig::Memory,
            multipart_threshold: Self::DEFAULT_MULTIPART_THRESHOLD,
        }
    }
}

/// Blob storage in an object-storage bucket.
#[derive(Debug)]
pub struct BucketStore {
    store: Arc<dyn ObjectStore>,
    runtime: Runtime,
    multipart_threshold: usize,
}

impl BucketStore {
    /// Connect to the bucket described by `config`.
    pub fn new(config: &BucketConfig) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match &config.store {
            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let mut builder = AmazonS3Builder::new()
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or(DEFAULT_REGION));
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_allow_http(endpoint.starts_with("http://"))
                        .with_endpoint(endpoint);
                }
                Arc::new(builder.build()?)
            }
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),
        };
        Self::with_store(store, config.multipart_threshold)
    }

    /// Wrap an already-built object store.
    pub fn with_store(store: Arc<dyn ObjectStore>, multipart_threshold: usize) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            store,
            runtime,
            multipart_threshold,
        })
    }

    fn location(name: &str) -> Result<ObjectPath> {
        validate_name(name)?;
        ObjectPath::parse(name).map_err(|_| BlobError::InvalidName {
            name: name.to_string(),
            reason: "not a valid object key",
        })
    }

    /// Stream the rest of `content` into `writer` after `head`.
    async fn write_parts(
        writer: &mut WriteMultipart,
        head: &[u8],
        content: &mut (dyn Read + Send),
    ) -> Result<u64> {
        writer.write(head);
        let mut size = head.len() as u64;
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let n = match content.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await?;
            writer.write(&buf[..n]);
            size += n as u64;
        }
        Ok(size)
    }
}

impl BlobStore for BucketStore {
    fn put(&self, blob: Blob) -> Result<()> {
        let (name, mut content, content_type) = blob.into_parts();
        let location = Self::location(&name)?;

        debug!(name = %name, content_type = %content_type, "uploading blob");

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.into());

        // One byte past the threshold tells us whether a single PUT will do.
        let limit = (self.multipart_threshold as u64).saturating_add(1);
        let mut head = Vec::new();
        content
            .by_ref()
            .take(limit)
            .read_to_end(&mut head)?;

        if head.len() <= self.multipart_threshold {
            let size = head.len();
            let opts = PutOptions {
                attributes,
                ..Default::default()
            };
            self.runtime
                .block_on(self.store.put_opts(&location, PutPayload::from(head), opts))?;
            info!(name = %name, size, "blob uploaded");
            return Ok(());
        }

        let size = self.runtime.block_on(async {
            let opts = PutMultipartOpts {
                attributes,
                ..Default::default()
            };
            let upload = self.store.put_multipart_opts(&location, opts).await?;
            let chunk_size = self.multipart_threshold.max(MIN_PART_SIZE);
            let mut writer = WriteMultipart::new_with_chunk_size(upload, chunk_size);

            match Self::write_parts(&mut writer, &head, content.as_mut()).await {
                Ok(size) => {
                    writer.finish().await?;
                    Ok::<_, BlobError>(size)
                }
                Err(e) => {
                    if let Err(abort) = writer.abort().await {
                        warn!(name = %name, error = %abort, "failed to abort multipart upload");
                    }
                    Err(e)
                }
            }
        })?;

        info!(name = %name, size, "blob uploaded in parts");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Blob>> {
        let location = match Self::location(name) {
            Ok(location) => location,
            Err(e) => {
                debug!(name = %name, error = %e, "unstorable name, treating as absent");
                return Ok(None);
            }
        };

        let fetched = self.runtime.block_on(async {
            let result = match self.store.get(&location).await {
                Ok(result) => result,
                Err(object_store::Error::NotFound { .. }) => return Ok(None),
                Err(e) => return Err(e),
            };
            let content_type = result
                .attributes
                .get(&Attribute::ContentType)
                .map(|value| AsRef::<str>::as_ref(value).to_string());
            let bytes = result.bytes().await?;
            Ok::<_, object_store::Error>(Some((content_type, bytes)))
        })?;

        let Some((content_type, bytes)) = fetched else {
            debug!(name = %name, "blob not found");
            return Ok(None);
        };
        let content_type = content_type
            .ok_or_else(|| BlobError::inconsistent(name, "object has no content-type"))?;

        debug!(name = %name, content_type = %content_type, size = bytes.len(), "blob found");
        Ok(Some(Blob::new(name, bytes.reader(), content_type)))
    }

    fn delete_all(&self) -> Result<()> {
        let removed = self.runtime.block_on(async {
            let locations = self
                .store
                .list(None)
                .map_ok(|meta| meta.location)
                .boxed();
            self.store
                .delete_stream(locations)
                .try_fold(0usize, |n, _| async move { Ok(n + 1) })
                .await
        })?;

        info!(store = %self.store, removed, "deleted all blobs");
        Ok(())
    }
}
