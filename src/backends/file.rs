//! Filesystem backend.
//!
//! Layout under the root directory:
//! ```text
//! <root>/.lock            advisory lock shared by every FileStore on this root
//! <root>/<name>           raw blob bytes
//! <root>/<name>.metadata  content-type, raw UTF-8, whole file
//! ```
//!
//! Writes go to temp files (`.tmp*`) next to their destination and are
//! renamed into place while holding the exclusive lock. The old data file is
//! removed first, so an interrupted commit leaves the name absent rather
//! than pairing new bytes with an old content-type.

use crate::error::{BlobError, Result};
use crate::store::BlobStore;
use crate::types::{validate_name, Blob};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Suffix of the sibling file holding a blob's content-type.
const METADATA_SUFFIX: &str = ".metadata";

/// Lock file name, relative to the root.
const LOCK_FILE: &str = ".lock";

/// Prefix of in-flight temp files.
const TEMP_PREFIX: &str = ".tmp";

/// Longest segment that still fits a 255-byte file name with the metadata
/// suffix appended.
const MAX_SEGMENT_LEN: usize = 255 - METADATA_SUFFIX.len();

/// Blob storage in a local directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Held store lock; released on drop.
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "failed to release blob store lock");
        }
    }
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the data file for `name`.
    pub fn data_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Path of the content-type file for `name`.
    pub fn metadata_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}{METADATA_SUFFIX}"))
    }

    /// Shared rules plus the names this layout reserves for itself.
    fn validate(name: &str) -> Result<()> {
        validate_name(name)?;
        for segment in name.split('/') {
            if segment.starts_with('.') {
                return Err(BlobError::InvalidName {
                    name: name.to_string(),
                    reason: "segments starting with '.' are reserved",
                });
            }
            if segment.len() > MAX_SEGMENT_LEN {
                return Err(BlobError::InvalidName {
                    name: name.to_string(),
                    reason: "path segment is too long",
                });
            }
            if segment.ends_with(METADATA_SUFFIX) {
                return Err(BlobError::InvalidName {
                    name: name.to_string(),
                    reason: "segments ending with '.metadata' are reserved",
                });
            }
        }
        Ok(())
    }

    fn lock(&self, mode: LockMode) -> Result<StoreLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;
        match mode {
            LockMode::Shared => FileExt::lock_shared(&file)?,
            LockMode::Exclusive => FileExt::lock_exclusive(&file)?,
        }
        Ok(StoreLock { file })
    }
}

impl BlobStore for FileStore {
    fn put(&self, blob: Blob) -> Result<()> {
        let (name, mut content, content_type) = blob.into_parts();
        Self::validate(&name)?;

        let data_path = self.data_path(&name);
        let metadata_path = self.metadata_path(&name);
        let dir = data_path.parent().unwrap_or(self.root.as_path()).to_path_buf();
        fs::create_dir_all(&dir)?;

        debug!(name = %name, content_type = %content_type, "storing blob");

        // Stage both halves; dropping a NamedTempFile deletes it, so any early
        // return below leaves the previous blob untouched.
        let mut data_tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)?;
        let size = {
            let mut writer = BufWriter::new(data_tmp.as_file_mut());
            let size = io::copy(&mut content, &mut writer)?;
            writer.flush()?;
            size
        };
        drop(content);
        data_tmp.as_file().sync_all()?;

        let mut metadata_tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)?;
        metadata_tmp.write_all(content_type.as_bytes())?;
        metadata_tmp.as_file().sync_all()?;

        {
            let _lock = self.lock(LockMode::Exclusive)?;
            remove_if_exists(&data_path)?;
            persist(metadata_tmp, &metadata_path)?;
            persist(data_tmp, &data_path)?;
        }
        sync_dir(&dir)?;

        info!(name = %name, size, "blob stored");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Blob>> {
        if let Err(e) = Self::validate(name) {
            debug!(name = %name, error = %e, "unstorable name, treating as absent");
            return Ok(None);
        }

        let _lock = self.lock(LockMode::Shared)?;

        let data = match File::open(self.data_path(name)) {
            Ok(file) => file,
            // NotADirectory: a leading segment is itself a blob.
            // InvalidFilename: the full path is too long to have been stored.
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound
                        | io::ErrorKind::NotADirectory
                        | io::ErrorKind::InvalidFilename
                ) =>
            {
                debug!(name = %name, "blob not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if data.metadata()?.is_dir() {
            // Only a prefix of nested blob names.
            return Ok(None);
        }

        let content_type = match fs::read(self.metadata_path(name)) {
            Ok(bytes) => String::from_utf8(bytes)
                .map_err(|_| BlobError::inconsistent(name, "metadata is not valid UTF-8"))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BlobError::inconsistent(name, "metadata file is missing"));
            }
            Err(e) => return Err(e.into()),
        };

        debug!(name = %name, content_type = %content_type, "blob found");
        Ok(Some(Blob::new(name, BufReader::new(data), content_type)))
    }

    fn delete_all(&self) -> Result<()> {
        let _lock = self.lock(LockMode::Exclusive)?;

        let mut removed = 0usize;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_name() == LOCK_FILE {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            removed += 1;
        }

        info!(root = %self.root.display(), removed, "deleted all blobs");
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn persist(tmp: NamedTempFile, path: &Path) -> io::Result<()> {
    tmp.persist(path).map(|_| ()).map_err(|e| e.error)
}

/// Make the renames themselves durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
