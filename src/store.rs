//! File access seam for traversal and executable resolution.
//!
//! The indexer never touches the filesystem directly; it goes through a
//! `FileStore` so I/O failures stay catchable per file and tests can run
//! against temp directories without platform-specific layout assumptions.

use std::fs;
use std::path::Path;

use crate::error::{LensError, Result};

/// Read-only file access used by the traverser and the executable scanner.
pub trait FileStore: Send + Sync {
    /// Check whether a file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Read a file as UTF-8 text.
    fn read_text(&self, path: &Path) -> Result<String>;

    /// Read a file's raw bytes (used for content hashing).
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;
}

/// `FileStore` backed by the real filesystem.
#[derive(Debug, Default, Clone)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|source| LensError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|source| LensError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_text_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.graphql");
        fs::write(&path, "type Query { ok: Boolean }").unwrap();

        let store = DiskStore;
        assert!(store.exists(&path));
        assert_eq!(store.read_text(&path).unwrap(), "type Query { ok: Boolean }");
        assert_eq!(store.read_bytes(&path).unwrap(), b"type Query { ok: Boolean }");
    }

    #[test]
    fn test_missing_file() {
        let store = DiskStore;
        let path = Path::new("/nonexistent/file.graphql");
        assert!(!store.exists(path));
        assert!(store.read_text(path).is_err());
    }
}
