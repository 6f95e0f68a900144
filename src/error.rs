//! Error types for the blob store.

use thiserror::Error;

/// Main error type for blob store operations.
///
/// A missing blob is not an error: [`crate::BlobStore::get`] returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Data is present but its content-type cannot be recovered.
    #[error("Inconsistent blob {name}: {reason}")]
    Inconsistent { name: String, reason: String },

    #[error("Invalid blob name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BlobError {
    /// Whether this error came from reading or writing the backing medium.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            BlobError::Io(_) | BlobError::ObjectStore(_) | BlobError::Inconsistent { .. }
        )
    }

    pub(crate) fn inconsistent(name: &str, reason: impl Into<String>) -> Self {
        BlobError::Inconsistent {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BlobError {
    fn from(e: serde_json::Error) -> Self {
        BlobError::Config(e.to_string())
    }
}

/// Result type for blob store operations.
pub type Result<T> = std::result::Result<T, BlobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_failure_class() {
        let io = BlobError::from(std::io::Error::other("disk full"));
        assert!(io.is_io_failure());

        assert!(BlobError::inconsistent("covers-1", "metadata missing").is_io_failure());

        let invalid = BlobError::InvalidName {
            name: "..".into(),
            reason: "relative segment",
        };
        assert!(!invalid.is_io_failure());
        assert!(!BlobError::Config("bad".into()).is_io_failure());
    }
}
