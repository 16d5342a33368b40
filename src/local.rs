//! Local filesystem operations used by the download protocol.

use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Filesystem capabilities the pipeline needs.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Returns whether `path` exists. Errors other than "not found" are reported.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Creates `path` and all missing parents.
    async fn ensure_dir(&self, path: &Path) -> io::Result<()>;

    /// Creates a zero-byte marker file at `path`.
    async fn create_marker(&self, path: &Path) -> io::Result<()>;

    async fn remove_marker(&self, path: &Path) -> io::Result<()>;
}

/// [`LocalStore`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

#[async_trait]
impl LocalStore for FsStore {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn create_marker(&self, path: &Path) -> io::Result<()> {
        tokio::fs::File::create(path).await?;
        Ok(())
    }

    async fn remove_marker(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
