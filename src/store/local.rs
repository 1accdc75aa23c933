//! # Local Filesystem Blob Store
//!
//! Layout: `<root>/<record id>/<blob name>`. A sealed record carries a
//! `.sealed` marker file in its directory.
//!
//! Writes are staged in a temporary file inside the record directory and
//! renamed into place, so a reader never observes a half-written blob. The
//! staging file is removed whether or not the write succeeds.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;

use super::blob::{check_name, BlobStore};
use super::errors::{StoreError, StoreResult};
use super::RecordId;

const SEAL_MARKER: &str = ".sealed";

fn io_error(e: io::Error) -> StoreError {
    StoreError::IoError(e.to_string())
}

/// Local filesystem blob store
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new local store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_dir(&self, record: &RecordId) -> PathBuf {
        self.root.join(record.to_string())
    }

    fn blob_path(&self, record: &RecordId, name: &str) -> StoreResult<PathBuf> {
        check_name(name)?;
        Ok(self.record_dir(record).join(name))
    }

    fn check_writable(&self, record: &RecordId) -> StoreResult<()> {
        if self.is_sealed(record)? {
            return Err(StoreError::Immutable(format!("blobs of record {}", record)));
        }
        Ok(())
    }
}

impl BlobStore for LocalBlobStore {
    fn write(&self, record: &RecordId, name: &str, data: &[u8]) -> StoreResult<()> {
        let full_path = self.blob_path(record, name)?;
        self.check_writable(record)?;

        let dir = self.record_dir(record);
        fs::create_dir_all(&dir).map_err(io_error)?;

        let mut staged = NamedTempFile::new_in(&dir).map_err(io_error)?;
        staged.write_all(data).map_err(io_error)?;
        staged.as_file().sync_all().map_err(io_error)?;
        staged.persist(&full_path).map_err(|e| io_error(e.error))?;

        Ok(())
    }

    fn read(&self, record: &RecordId, name: &str) -> StoreResult<Vec<u8>> {
        let full_path = self.blob_path(record, name)?;

        fs::read(&full_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::BlobNotFound(format!("{}/{}", record, name))
            } else {
                io_error(e)
            }
        })
    }

    fn exists(&self, record: &RecordId, name: &str) -> StoreResult<bool> {
        Ok(self.blob_path(record, name)?.is_file())
    }

    fn delete(&self, record: &RecordId, name: &str) -> StoreResult<()> {
        let full_path = self.blob_path(record, name)?;
        self.check_writable(record)?;

        fs::remove_file(&full_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::BlobNotFound(format!("{}/{}", record, name))
            } else {
                io_error(e)
            }
        })
    }

    fn seal(&self, record: &RecordId) -> StoreResult<()> {
        let dir = self.record_dir(record);
        fs::create_dir_all(&dir).map_err(io_error)?;
        fs::write(dir.join(SEAL_MARKER), b"").map_err(io_error)
    }

    fn is_sealed(&self, record: &RecordId) -> StoreResult<bool> {
        Ok(self.record_dir(record).join(SEAL_MARKER).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path());
        let record = RecordId::new();

        store.write(&record, "operations.bin", b"hello").unwrap();
        assert_eq!(store.read(&record, "operations.bin").unwrap(), b"hello");
    }

    #[test]
    fn test_overwrite_leaves_no_staging_files() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path());
        let record = RecordId::new();

        store.write(&record, "blob", b"one").unwrap();
        store.write(&record, "blob", b"two").unwrap();
        assert_eq!(store.read(&record, "blob").unwrap(), b"two");

        let entries: Vec<_> = fs::read_dir(temp.path().join(record.to_string()))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("blob")]);
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path());
        let record = RecordId::new();

        store.write(&record, "blob", b"bye").unwrap();
        assert!(store.exists(&record, "blob").unwrap());

        store.delete(&record, "blob").unwrap();
        assert!(!store.exists(&record, "blob").unwrap());
    }

    #[test]
    fn test_not_found() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path());

        let result = store.read(&RecordId::new(), "missing");
        assert!(matches!(result, Err(StoreError::BlobNotFound(_))));
    }

    #[test]
    fn test_seal_survives_new_handle() {
        let temp = TempDir::new().unwrap();
        let record = RecordId::new();

        let store = LocalBlobStore::new(temp.path());
        store.write(&record, "blob", b"x").unwrap();
        store.seal(&record).unwrap();

        let reopened = LocalBlobStore::new(temp.path());
        assert!(reopened.is_sealed(&record).unwrap());
        assert!(reopened.write(&record, "blob", b"y").unwrap_err().is_immutable());
    }
}
