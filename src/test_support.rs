//! In-memory drive and failing stores for unit tests.

use crate::catalog::{ContentSource, DownloadableFile, RemoteCatalog};
use crate::error::DownloadError;
use crate::local::LocalStore;
use crate::types::{RemoteEntry, ROOT_FOLDER_ID};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A drive tree held in memory. Folder `""` is the root.
pub(crate) struct MemoryCatalog {
    folders: HashMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, Vec<u8>>,
    broken_listings: HashSet<String>,
    broken_opens: HashSet<String>,
    broken_transfers: HashSet<String>,
    transfers: Arc<AtomicUsize>,
}

impl MemoryCatalog {
    pub(crate) fn new() -> Self {
        let mut folders = HashMap::new();
        folders.insert(ROOT_FOLDER_ID.to_string(), Vec::new());
        Self {
            folders,
            contents: HashMap::new(),
            broken_listings: HashSet::new(),
            broken_opens: HashSet::new(),
            broken_transfers: HashSet::new(),
            transfers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn folder(mut self, parent: &str, id: &str, name: &str) -> Self {
        self.folders
            .entry(parent.to_string())
            .or_default()
            .push(RemoteEntry::folder(id, name));
        self.folders.entry(id.to_string()).or_default();
        self
    }

    pub(crate) fn file(mut self, parent: &str, id: &str, name: &str, content: &[u8]) -> Self {
        self.folders
            .entry(parent.to_string())
            .or_default()
            .push(RemoteEntry::file(id, name, content.len() as u64));
        self.contents.insert(id.to_string(), content.to_vec());
        self
    }

    pub(crate) fn break_listing(mut self, folder_id: &str) -> Self {
        self.broken_listings.insert(folder_id.to_string());
        self
    }

    pub(crate) fn break_open(mut self, file_id: &str) -> Self {
        self.broken_opens.insert(file_id.to_string());
        self
    }

    pub(crate) fn break_transfer(mut self, file_id: &str) -> Self {
        self.broken_transfers.insert(file_id.to_string());
        self
    }

    /// Number of transfers started so far.
    pub(crate) fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }

    fn entry(&self, file_id: &str) -> Option<&RemoteEntry> {
        self.folders
            .values()
            .flatten()
            .find(|entry| entry.id == file_id)
    }
}

#[async_trait]
impl RemoteCatalog for MemoryCatalog {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteEntry>, DownloadError> {
        if self.broken_listings.contains(folder_id) {
            return Err(DownloadError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("listing {} failed", folder_id),
            });
        }
        self.folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound(folder_id.to_string()))
    }

    async fn open_file(&self, file_id: &str) -> Result<DownloadableFile, DownloadError> {
        if self.broken_opens.contains(file_id) {
            return Err(DownloadError::Api {
                status: StatusCode::BAD_GATEWAY,
                body: format!("detail for {} unavailable", file_id),
            });
        }
        let entry = self
            .entry(file_id)
            .ok_or_else(|| DownloadError::NotFound(file_id.to_string()))?;
        let content = MemoryContent {
            bytes: self.contents.get(file_id).cloned().unwrap_or_default(),
            fail: self.broken_transfers.contains(file_id),
            transfers: Arc::clone(&self.transfers),
        };
        Ok(DownloadableFile::new(
            entry.id.clone(),
            entry.name.clone(),
            entry.size,
            Arc::new(content),
        ))
    }
}

struct MemoryContent {
    bytes: Vec<u8>,
    fail: bool,
    transfers: Arc<AtomicUsize>,
}

#[async_trait]
impl ContentSource for MemoryContent {
    async fn transfer(&self, local_path: &Path) -> Result<u64, DownloadError> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            // Leave a truncated file behind, like a dropped connection would.
            let half = &self.bytes[..self.bytes.len() / 2];
            tokio::fs::write(local_path, half).await?;
            return Err(DownloadError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        tokio::fs::write(local_path, &self.bytes).await?;
        Ok(self.bytes.len() as u64)
    }
}

/// Which [`LocalStore`] operation [`FailingStore`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailOn {
    Exists,
    EnsureDir,
    CreateMarker,
    RemoveMarker,
}

/// Delegates to the real filesystem except for one operation that always fails.
pub(crate) struct FailingStore {
    pub(crate) fail_on: FailOn,
}

impl FailingStore {
    fn check(&self, op: FailOn) -> io::Result<()> {
        if self.fail_on == op {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FailingStore {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        self.check(FailOn::Exists)?;
        crate::local::FsStore.exists(path).await
    }

    async fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        self.check(FailOn::EnsureDir)?;
        crate::local::FsStore.ensure_dir(path).await
    }

    async fn create_marker(&self, path: &Path) -> io::Result<()> {
        self.check(FailOn::CreateMarker)?;
        crate::local::FsStore.create_marker(path).await
    }

    async fn remove_marker(&self, path: &Path) -> io::Result<()> {
        self.check(FailOn::RemoveMarker)?;
        crate::local::FsStore.remove_marker(path).await
    }
}
