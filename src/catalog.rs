//! Remote catalog abstraction: listing folders and opening files for transfer.

use crate::error::DownloadError;
use crate::types::{EntryKind, RemoteEntry, ROOT_FOLDER_ID};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Something that can stream a remote file's full content to a local path.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Writes the whole content to `local_path`, replacing anything already there.
    ///
    /// Returns the number of bytes written.
    async fn transfer(&self, local_path: &Path) -> Result<u64, DownloadError>;
}

/// A remote file that has been resolved into a transfer handle.
#[derive(Clone)]
pub struct DownloadableFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    source: Arc<dyn ContentSource>,
}

impl DownloadableFile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            source,
        }
    }

    /// Streams the file to `local_path` with overwrite semantics.
    pub async fn transfer(&self, local_path: &Path) -> Result<u64, DownloadError> {
        self.source.transfer(local_path).await
    }
}

impl fmt::Debug for DownloadableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadableFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Read access to a remote drive.
///
/// Implementors provide listing and file opening; path resolution is derived
/// from listing by walking one path component at a time.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Lists the direct children of a folder.
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteEntry>, DownloadError>;

    /// Resolves a file id into a downloadable handle.
    async fn open_file(&self, file_id: &str) -> Result<DownloadableFile, DownloadError>;

    /// Finds the child of `folder_id` called `name`, if any.
    async fn find_child(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<RemoteEntry>, DownloadError> {
        let entries = self.list_folder(folder_id).await?;
        Ok(entries.into_iter().find(|entry| entry.name == name))
    }

    /// Resolves an absolute remote path (e.g. `/Movies/2024`) to a folder id.
    ///
    /// `/`, the empty string and `.` all resolve to the root folder.
    async fn resolve_folder_id(&self, path: &str) -> Result<String, DownloadError> {
        let mut current = ROOT_FOLDER_ID.to_string();
        for component in path_components(path) {
            let entry = self
                .find_child(&current, component)
                .await?
                .ok_or_else(|| DownloadError::NotFound(path.to_string()))?;
            if entry.kind != EntryKind::Folder {
                return Err(DownloadError::NotAFolder(path.to_string()));
            }
            current = entry.id;
        }
        Ok(current)
    }

    /// Resolves a path relative to `parent_folder_id` (e.g. `a/file1`) to a file entry.
    async fn resolve_file_stat(
        &self,
        parent_folder_id: &str,
        relative_path: &str,
    ) -> Result<RemoteEntry, DownloadError> {
        let components: Vec<&str> = path_components(relative_path).collect();
        let Some((file_name, folders)) = components.split_last() else {
            return Err(DownloadError::NotAFile(relative_path.to_string()));
        };

        let mut current = parent_folder_id.to_string();
        for folder in folders {
            let entry = self
                .find_child(&current, folder)
                .await?
                .ok_or_else(|| DownloadError::NotFound(relative_path.to_string()))?;
            if entry.kind != EntryKind::Folder {
                return Err(DownloadError::NotFound(relative_path.to_string()));
            }
            current = entry.id;
        }

        let entry = self
            .find_child(&current, file_name)
            .await?
            .ok_or_else(|| DownloadError::NotFound(relative_path.to_string()))?;
        if entry.kind != EntryKind::File {
            return Err(DownloadError::NotAFile(relative_path.to_string()));
        }
        Ok(entry)
    }
}

/// Splits a remote path into its non-empty components, ignoring `.`.
pub(crate) fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|component| !component.is_empty() && *component != ".")
}
