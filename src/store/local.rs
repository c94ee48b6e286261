//! Local directory store.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::filter::{FileFilter, SKIP_DIRS};
use super::{FileStore, Snapshot, StoreError};
use crate::error::{LoreError, Result};
use crate::models::SourceFile;
use crate::utils::relative_store_path;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    snapshot: Snapshot,
}

impl LocalStore {
    /// Walk `root`, keeping every file the filter admits.
    ///
    /// Fails with `SourceUnavailable` when `root` is not a directory or no
    /// file survives filtering.
    pub fn open(root: &Path, filter: &FileFilter) -> Result<Self> {
        Self::open_as(root, &root.display().to_string(), filter)
    }

    /// Like [`LocalStore::open`] but reports `location` instead of the path,
    /// e.g. the URL of a cloned repository.
    pub fn open_as(root: &Path, location: &str, filter: &FileFilter) -> Result<Self> {
        if !root.is_dir() {
            return Err(LoreError::SourceUnavailable(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }

        let mut candidates = Vec::new();
        collect_files(root, &mut candidates)?;

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for path in candidates {
            let Some(relative) = relative_store_path(&path, root) else {
                continue;
            };
            if !filter.admits_path(&relative) {
                skipped += 1;
                continue;
            }
            let size = match fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    debug!(path = %relative, error = %e, "skipping unreadable file");
                    skipped += 1;
                    continue;
                }
            };
            if !filter.admits_size(size) {
                debug!(path = %relative, size, "skipping large file");
                skipped += 1;
                continue;
            }
            match fs::read(&path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(content) => entries.push((relative, content)),
                    Err(_) => {
                        debug!(path = %relative, "skipping non-UTF-8 file");
                        skipped += 1;
                    }
                },
                Err(e) => {
                    debug!(path = %relative, error = %e, "skipping unreadable file");
                    skipped += 1;
                }
            }
        }

        if entries.is_empty() {
            return Err(LoreError::SourceUnavailable(format!(
                "no readable source files under {location}"
            )));
        }

        info!(files = entries.len(), skipped, location, "loaded source files");
        Ok(Self {
            root: root.to_path_buf(),
            snapshot: Snapshot::new(location, entries),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStore for LocalStore {
    fn location(&self) -> &str {
        self.snapshot.location()
    }

    fn list(&self) -> &[SourceFile] {
        self.snapshot.files()
    }

    fn read(&self, path: &str) -> std::result::Result<&str, StoreError> {
        self.snapshot.read(path)
    }
}

/// Walk `dir` recursively. Only an unreadable `dir` itself is an error;
/// unreadable subdirectories are skipped like unreadable files.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(_) => continue,
        };
        if file_type.is_dir() {
            if SKIP_DIRS.contains(&name.as_str()) || name.starts_with('.') {
                continue;
            }
            if let Err(e) = collect_files(&entry.path(), out) {
                debug!(dir = %entry.path().display(), error = %e, "skipping unreadable directory");
            }
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}
