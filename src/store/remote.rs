//! Remote repository store: shallow clone into a temporary directory.

use tempfile::TempDir;
use tracing::info;

use super::git::{is_transient_failure, run_git_checked};
use super::{FileFilter, FileStore, LocalStore, StoreError};
use crate::error::{LoreError, Result};
use crate::models::SourceFile;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// A cloned repository. The checkout is removed when the store is dropped.
#[derive(Debug)]
pub struct RemoteStore {
    inner: LocalStore,
    _checkout: TempDir,
}

impl RemoteStore {
    pub fn clone_repo(
        url: &str,
        filter: &FileFilter,
        depth: u32,
        retry: &RetryPolicy,
    ) -> Result<Self> {
        if which::which("git").is_err() {
            return Err(LoreError::SourceUnavailable(
                "git is not installed or not in PATH".to_string(),
            ));
        }

        let checkout = TempDir::new()?;
        let target = checkout.path().join("repo");
        let target_str = target.to_string_lossy().to_string();
        let depth_str = depth.max(1).to_string();

        info!(url, "cloning repository");
        retry_with_backoff(retry, "git clone", is_transient_failure, |_| {
            // A failed attempt can leave a partial checkout behind
            if target.exists() {
                let _ = std::fs::remove_dir_all(&target);
            }
            run_git_checked(
                &["clone", "--depth", &depth_str, "--quiet", url, &target_str],
                checkout.path(),
            )
        })
        .map_err(|e| LoreError::SourceUnavailable(format!("could not fetch {url}: {e:#}")))?;

        let inner = LocalStore::open_as(&target, url, filter)?;
        Ok(Self {
            inner,
            _checkout: checkout,
        })
    }
}

impl FileStore for RemoteStore {
    fn location(&self) -> &str {
        self.inner.location()
    }

    fn list(&self) -> &[SourceFile] {
        self.inner.list()
    }

    fn read(&self, path: &str) -> std::result::Result<&str, StoreError> {
        self.inner.read(path)
    }
}
