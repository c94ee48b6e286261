//! Read-only views over a codebase.
//!
//! Every store applies the same [`FileFilter`] before any content is kept, so
//! excluded or oversized files never reach the pipeline. Files are indexed in
//! sorted path order; the index is stable for the lifetime of the store.

pub mod filter;
pub mod git;
pub mod local;
pub mod memory;
pub mod remote;

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

use crate::models::SourceFile;
use crate::utils::normalize_path;

pub use filter::FileFilter;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),
}

/// Uniform read-only access to a filtered file set.
pub trait FileStore {
    /// Human-readable origin (directory path or repository URL)
    fn location(&self) -> &str;

    /// All admitted files in index order.
    fn list(&self) -> &[SourceFile];

    /// Content of an admitted file. Paths are normalized before lookup.
    fn read(&self, path: &str) -> Result<&str, StoreError>;

    /// Content hash of the whole snapshot.
    fn fingerprint(&self) -> String {
        fingerprint(self.list())
    }
}

/// SHA-256 over every (path, content) pair, hex encoded.
pub fn fingerprint(files: &[SourceFile]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(file.content.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Indexed, immutable file set shared by the concrete stores.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    location: String,
    files: Vec<SourceFile>,
    by_path: HashMap<String, usize>,
}

impl Snapshot {
    /// Sort entries by path and assign indices. Entries must already be filtered.
    pub(crate) fn new(location: impl Into<String>, mut entries: Vec<(String, String)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|a, b| a.0 == b.0);

        let files: Vec<SourceFile> = entries
            .into_iter()
            .enumerate()
            .map(|(index, (path, content))| SourceFile::new(index, path, content))
            .collect();
        let by_path = files
            .iter()
            .map(|file| (file.path.clone(), file.index))
            .collect();

        Self {
            location: location.into(),
            files,
            by_path,
        }
    }

    pub(crate) fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub(crate) fn read(&self, path: &str) -> Result<&str, StoreError> {
        let normalized = normalize_path(path);
        self.by_path
            .get(&normalized)
            .map(|&idx| self.files[idx].content.as_str())
            .ok_or_else(|| StoreError::NotFound(path.trim().to_string()))
    }
}
