//! The storage contract and the configured backend selection.

use crate::backends::{BucketConfig, BucketStore, FileStore, ObjectStoreConfig};
use crate::error::{BlobError, Result};
use crate::types::Blob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default root directory of the filesystem backend.
pub const DEFAULT_ROOT: &str = "blobs";

/// Capability shared by every backend.
///
/// Implementations are stateless per call: each operation is an independent
/// round trip to the backing medium.
pub trait BlobStore: Send + Sync {
    /// Store `blob`, replacing anything already stored under its name.
    ///
    /// The content reader is drained and dropped before this returns, on
    /// success and on failure. A reader never observes the new bytes paired
    /// with the old content-type or the reverse.
    fn put(&self, blob: Blob) -> Result<()>;

    /// Fetch the blob stored under `name`, or `None` if there is none.
    fn get(&self, name: &str) -> Result<Option<Blob>>;

    /// Remove every stored blob.
    fn delete_all(&self) -> Result<()>;
}

impl<T: BlobStore + ?Sized> BlobStore for &T {
    fn put(&self, blob: Blob) -> Result<()> {
        (**self).put(blob)
    }

    fn get(&self, name: &str) -> Result<Option<Blob>> {
        (**self).get(name)
    }

    fn delete_all(&self) -> Result<()> {
        (**self).delete_all()
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Box<T> {
    fn put(&self, blob: Blob) -> Result<()> {
        (**self).put(blob)
    }

    fn get(&self, name: &str) -> Result<Option<Blob>> {
        (**self).get(name)
    }

    fn delete_all(&self) -> Result<()> {
        (**self).delete_all()
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn put(&self, blob: Blob) -> Result<()> {
        (**self).put(blob)
    }

    fn get(&self, name: &str) -> Result<Option<Blob>> {
        (**self).get(name)
    }

    fn delete_all(&self) -> Result<()> {
        (**self).delete_all()
    }
}

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Sibling data/metadata files under a local directory.
    File {
        /// Root directory; created on open if missing.
        root: PathBuf,
    },

    /// Objects in an object-storage bucket.
    Bucket(BucketConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            root: PathBuf::from(DEFAULT_ROOT),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Build configuration from `BLOBSTORE_*` environment variables.
    ///
    /// `BLOBSTORE_BACKEND` selects `file` (default), `s3` or `memory`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = var("BLOBSTORE_BACKEND").unwrap_or_else(|| "file".to_string());

        let multipart_threshold = match var("BLOBSTORE_MULTIPART_THRESHOLD") {
            Some(raw) => raw.parse().map_err(|_| {
                BlobError::Config(format!("BLOBSTORE_MULTIPART_THRESHOLD is not a size: {raw}"))
            })?,
            None => BucketConfig::DEFAULT_MULTIPART_THRESHOLD,
        };

        let required = |key: &str| {
            var(key).ok_or_else(|| BlobError::Config(format!("{key} must be set")))
        };

        match backend.as_str() {
            "file" => Ok(StoreConfig::File {
                root: var("BLOBSTORE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            }),
            "s3" => Ok(StoreConfig::Bucket(BucketConfig {
                store: ObjectStoreConfig::S3 {
                    endpoint: var("BLOBSTORE_S3_ENDPOINT"),
                    access_key: required("BLOBSTORE_S3_ACCESS_KEY")?,
                    secret_key: required("BLOBSTORE_S3_SECRET_KEY")?,
                    bucket: required("BLOBSTORE_S3_BUCKET")?,
                    region: var("BLOBSTORE_S3_REGION"),
                },
                multipart_threshold,
            })),
            "memory" => Ok(StoreConfig::Bucket(BucketConfig {
                store: ObjectStoreConfig::Memory,
                multipart_threshold,
            })),
            other => Err(BlobError::Config(format!(
                "unknown BLOBSTORE_BACKEND {other:?} (expected file, s3 or memory)"
            ))),
        }
    }
}

/// The backend chosen by a [`StoreConfig`].
#[derive(Debug)]
pub enum Backend {
    File(FileStore),
    Bucket(BucketStore),
}

impl Backend {
    /// Open the backend described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::File { root } => {
                debug!(root = %root.display(), "opening file backend");
                Ok(Backend::File(FileStore::new(root)?))
            }
            StoreConfig::Bucket(bucket) => {
                debug!(store = bucket.store.kind(), "opening bucket backend");
                Ok(Backend::Bucket(BucketStore::new(bucket)?))
            }
        }
    }
}

impl BlobStore for Backend {
    fn put(&self, blob: Blob) -> Result<()> {
        match self {
            Backend::File(store) => store.put(blob),
            Backend::Bucket(store) => store.put(blob),
        }
    }

    fn get(&self, name: &str) -> Result<Option<Blob>> {
        match self {
            Backend::File(store) => store.get(name),
            Backend::Bucket(store) => store.get(name),
        }
    }

    fn delete_all(&self) -> Result<()> {
        match self {
            Backend::File(store) => store.delete_all(),
            Backend::Bucket(store) => store.delete_all(),
        }
    }
}
