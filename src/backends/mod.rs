//! Storage backends.
//!
//! [`FileStore`] keeps each blob as a data file plus a sibling `.metadata`
//! file under a local root. [`BucketStore`] keeps each blob as one object in
//! an object-storage bucket, with the content-type as object metadata.

mod bucket;
mod file;

pub use bucket::{BucketConfig, BucketStore, ObjectStoreConfig};
pub use file::FileStore;
