//! # Blob Store
//!
//! Named blobs with a content-type, stored in a local directory or in an
//! object-storage bucket behind one contract.
//!
//! ## Core Concepts
//!
//! - **Blob**: a name, a content reader consumed once by `put`, and a MIME type
//! - **BlobStore**: `put`, `get` and `delete_all`, implemented by every backend
//! - **FileStore**: data file plus a sibling `.metadata` file per blob
//! - **BucketStore**: one object per blob, content-type as object metadata
//! - **Backend**: the store selected by a [`StoreConfig`]
//!
//! ## Example
//!
//! ```no_run
//! use blob_store::{Backend, Blob, BlobStore, StoreConfig};
//!
//! # fn main() -> blob_store::Result<()> {
//! let store = Backend::open(&StoreConfig::default())?;
//!
//! store.put(Blob::from_bytes("covers-42", vec![0xFF, 0xD8], "image/jpeg"))?;
//!
//! if let Some(blob) = store.get("covers-42")? {
//!     assert_eq!(blob.content_type(), "image/jpeg");
//!     let bytes = blob.read_to_vec()?;
//! #   let _ = bytes;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod covers;
pub mod error;
pub mod store;
pub mod types;

// Re-exports
pub use backends::{BucketConfig, BucketStore, FileStore, ObjectStoreConfig};
pub use covers::{cover_blob_name, load_cover, load_cover_or_default, save_cover, CoverImage};
pub use error::{BlobError, Result};
pub use store::{Backend, BlobStore, StoreConfig, DEFAULT_ROOT};
pub use types::{Blob, IMAGE_JPEG};
