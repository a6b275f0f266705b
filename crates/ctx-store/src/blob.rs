//! Content-addressed blob storage under `<root>/objects/`.
//!
//! Layout: the first two hex characters of a digest form a subdirectory,
//! the remaining 62 are the filename, e.g. `objects/ab/cdef...`.

use ctx_error::{CtxError, ErrorCode};
use std::path::{Path, PathBuf};

/// A blob store rooted at a store's `objects/` directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    objects_dir: PathBuf,
}

impl BlobStore {
    /// Open a blob store at the given `objects/` directory. Does not create
    /// it; callers go through [`crate::layout::init`] for that.
    #[must_use]
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
        }
    }

    fn path_for_hex(&self, hex: &str) -> PathBuf {
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Write `bytes`, returning its canonical `sha256:<hex>` reference.
    /// A no-op if the content is already present (deduplication).
    pub fn write(&self, bytes: &[u8]) -> Result<String, CtxError> {
        let reference = ctx_hash::hash_content(bytes);
        let (_, hex) = ctx_hash::parse(&reference)?;
        let path = self.path_for_hex(hex);

        if path.exists() {
            return Ok(reference);
        }

        let subdir = path.parent().expect("path has a parent under objects_dir");
        std::fs::create_dir_all(subdir).map_err(|e| write_io_err(&path, e))?;

        let tmp_path = path.with_extension("tmp");
        write_readonly(&tmp_path, bytes).map_err(|e| write_io_err(&tmp_path, e))?;

        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_io_err(&path, e));
        }
        Ok(reference)
    }

    /// Read the blob for `reference`, verifying its content against the
    /// requested hash.
    pub fn read(&self, reference: &str) -> Result<Vec<u8>, CtxError> {
        let (_, hex) = ctx_hash::parse(reference)?;
        let path = self.path_for_hex(hex);

        let bytes = std::fs::read(&path).map_err(|_| {
            CtxError::new(ErrorCode::BlobNotFound, "blob not found")
                .with_context("reference", reference)
        })?;

        let actual = ctx_hash::hash_content(&bytes);
        if actual != reference {
            return Err(
                CtxError::new(ErrorCode::BlobIntegrityFailure, "blob content does not match its hash")
                    .with_context("reference", reference)
                    .with_context("actual", actual),
            );
        }
        Ok(bytes)
    }

    /// Check whether a blob file is present. Non-authoritative: the file
    /// may still fail the integrity check on a subsequent [`Self::read`].
    #[must_use]
    pub fn exists(&self, reference: &str) -> bool {
        match ctx_hash::parse(reference) {
            Ok((_, hex)) => self.path_for_hex(hex).exists(),
            Err(_) => false,
        }
    }
}

#[cfg(unix)]
fn write_readonly(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o444)
        .open(path)?;
    std::io::Write::write_all(&mut file, bytes)
}

#[cfg(not(unix))]
fn write_readonly(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)?;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    std::fs::set_permissions(path, perms)
}

fn write_io_err(path: &Path, e: std::io::Error) -> CtxError {
    CtxError::new(ErrorCode::Internal, "I/O error writing blob")
        .with_context("path", path.display().to_string())
        .with_context("error", e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("objects"));
        let reference = store.write(b"hello world").unwrap();
        assert!(store.exists(&reference));
        assert_eq!(store.read(&reference).unwrap(), b"hello world");
    }

    #[test]
    fn write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("objects"));
        let r1 = store.write(b"same content").unwrap();
        let r2 = store.write(b"same content").unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn read_missing_blob_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("objects"));
        let reference = ctx_hash::hash_content(b"never written");
        let err = store.read(&reference).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BlobNotFound);
    }

    #[test]
    fn read_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("objects"));
        let reference = store.write(b"original").unwrap();
        let (_, hex) = ctx_hash::parse(&reference).unwrap();
        let path = dir.path().join("objects").join(&hex[..2]).join(&hex[2..]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o644);
            std::fs::set_permissions(&path, perms).unwrap();
        }
        std::fs::write(&path, b"corrupted").unwrap();

        let err = store.read(&reference).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BlobIntegrityFailure);
    }

    #[test]
    fn blob_written_readonly() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("objects"));
        let reference = store.write(b"readonly check").unwrap();
        let (_, hex) = ctx_hash::parse(&reference).unwrap();
        let path = dir.path().join("objects").join(&hex[..2]).join(&hex[2..]);
        let perms = std::fs::metadata(&path).unwrap().permissions();
        assert!(perms.readonly());
    }
}
