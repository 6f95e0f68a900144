//! Core types for the blob store.

use crate::error::{BlobError, Result};
use std::fmt;
use std::io::{Cursor, Read};

/// Content-type of default cover images.
pub const IMAGE_JPEG: &str = "image/jpeg";

/// A named, typed byte payload.
///
/// The content is a reader that is consumed exactly once: passing a `Blob`
/// to [`crate::BlobStore::put`] moves the reader into the store, which
/// drains it and drops it before returning.
pub struct Blob {
    name: String,
    content: Box<dyn Read + Send>,
    content_type: String,
}

impl Blob {
    /// Create a blob over any reader.
    pub fn new(
        name: impl Into<String>,
        content: impl Read + Send + 'static,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: Box::new(content),
            content_type: content_type.into(),
        }
    }

    /// Create a blob over an in-memory buffer.
    pub fn from_bytes(
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::new(name, Cursor::new(content.into()), content_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Take the content reader, dropping name and content-type.
    pub fn into_content(self) -> Box<dyn Read + Send> {
        self.content
    }

    /// Split into `(name, content, content_type)`.
    pub fn into_parts(self) -> (String, Box<dyn Read + Send>, String) {
        (self.name, self.content, self.content_type)
    }

    /// Drain the content into memory.
    pub fn read_to_vec(self) -> std::io::Result<Vec<u8>> {
        let mut content = self.content;
        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Check the name rules shared by every backend.
///
/// Names are `/`-separated keys. Each segment must be non-empty and must not
/// be `.` or `..`; backslashes and NUL bytes are refused so a name means the
/// same thing on every platform and bucket.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(BlobError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.contains('\\') || name.contains('\0') {
        return invalid("backslash and NUL are not allowed");
    }
    for segment in name.split('/') {
        match segment {
            "" => return invalid("empty path segment"),
            "." | ".." => return invalid("relative path segment"),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_accessors() {
        let blob = Blob::from_bytes("covers-42", vec![0xFF, 0xD8, 0xFF], IMAGE_JPEG);
        assert_eq!(blob.name(), "covers-42");
        assert_eq!(blob.content_type(), "image/jpeg");
        assert_eq!(blob.read_to_vec().unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_debug_hides_content() {
        let blob = Blob::from_bytes("a", b"secret".to_vec(), "text/plain");
        let debug = format!("{blob:?}");
        assert!(debug.contains("\"a\""));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("covers-1").is_ok());
        assert!(validate_name("albums/7/cover").is_ok());
        assert!(validate_name(".hidden").is_ok());

        for bad in ["", "/abs", "a//b", "a/", "..", "a/../b", "./a", "a\\b", "a\0b"] {
            assert!(
                matches!(validate_name(bad), Err(BlobError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
