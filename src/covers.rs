//! Album cover images on top of any [`BlobStore`].
//!
//! Covers are stored under `covers-<album id>`. Reading a cover that was
//! never uploaded yields the caller's default image.

use crate::error::Result;
use crate::store::BlobStore;
use crate::types::{Blob, IMAGE_JPEG};
use std::io::Read;
use tracing::{debug, warn};

/// Bytes and content-type ready to be served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl CoverImage {
    /// A JPEG image, the type of the stock default cover.
    pub fn jpeg(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: IMAGE_JPEG.to_string(),
        }
    }
}

/// Blob name of the cover for `album_id`.
pub fn cover_blob_name(album_id: u64) -> String {
    format!("covers-{album_id}")
}

/// Store an uploaded cover, replacing any previous one.
pub fn save_cover(
    store: &dyn BlobStore,
    album_id: u64,
    content: impl Read + Send + 'static,
    content_type: &str,
) -> Result<()> {
    let name = cover_blob_name(album_id);
    debug!(album_id, name = %name, content_type, "saving cover");
    store.put(Blob::new(name, content, content_type))
}

/// Load the cover for `album_id`, or `default` if none was uploaded.
///
/// Storage failures are returned, not replaced by the default.
pub fn load_cover(store: &dyn BlobStore, album_id: u64, default: &CoverImage) -> Result<CoverImage> {
    match store.get(&cover_blob_name(album_id))? {
        Some(blob) => {
            let content_type = blob.content_type().to_string();
            let bytes = blob.read_to_vec()?;
            Ok(CoverImage {
                bytes,
                content_type,
            })
        }
        None => {
            debug!(album_id, "no cover stored, using default");
            Ok(default.clone())
        }
    }
}

/// Like [`load_cover`], but any failure also falls back to `default`.
pub fn load_cover_or_default(
    store: &dyn BlobStore,
    album_id: u64,
    default: &CoverImage,
) -> CoverImage {
    load_cover(store, album_id, default).unwrap_or_else(|e| {
        warn!(album_id, error = %e, "failed to read cover, using default");
        default.clone()
    })
}
