//! Data structures shared by the traversal and transfer stages.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of the sentinel written next to a file while it is being transferred.
///
/// Kept bit-exact so runs of older tools interoperate with ours.
pub const MARKER_SUFFIX: &str = ".pikpakclidownload";

/// Identifier of the drive's root folder.
pub const ROOT_FOLDER_ID: &str = "";

/// Whether a remote entry is a folder or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
}

/// One entry returned by a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Opaque identifier, unique within the drive.
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes. Always 0 for folders.
    pub size: u64,
}

impl RemoteEntry {
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Folder,
            size: 0,
        }
    }

    pub fn file(id: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// A listed file together with the local directory it must be written into.
///
/// The file name is only joined onto `destination` at download time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    pub entry: RemoteEntry,
    pub destination: PathBuf,
}

/// How a single file left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Content was streamed to disk and the marker removed.
    Downloaded,
    /// A complete copy from a prior run was already present.
    Skipped,
    /// Resolution, a filesystem check or the transfer itself failed.
    Failed,
}

/// Counts of outcomes for one run. Only reported, never used to retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Downloaded => self.downloaded += 1,
            TransferOutcome::Skipped => self.skipped += 1,
            TransferOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}

/// Configuration for a download run.
///
/// # Example
///
/// ```
/// use pikpak_dl::DownloadConfig;
///
/// let config = DownloadConfig {
///     concurrency: 4,
///     output: "downloads".into(),
///     remote_path: "/Movies".to_string(),
///     ..DownloadConfig::default()
/// };
/// assert_eq!(config.resolver_workers, 4);
/// ```
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Number of simultaneous file transfers (default: 1).
    pub concurrency: usize,
    /// Number of workers turning listed files into download handles (default: 4).
    ///
    /// Kept small so per-request latency is amortized without flooding the API.
    pub resolver_workers: usize,
    /// Local directory everything is written under (default: current directory).
    pub output: PathBuf,
    /// Remote folder to download from (default: drive root).
    pub remote_path: String,
    /// Folder id to use instead of resolving `remote_path`.
    pub parent_id: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            resolver_workers: 4,
            output: PathBuf::from("."),
            remote_path: "/".to_string(),
            parent_id: None,
        }
    }
}

/// Returns the sentinel path for a final local path: `<path>.pikpakclidownload`.
pub fn marker_path(path: &Path) -> PathBuf {
    let mut marker = OsString::from(path.as_os_str());
    marker.push(MARKER_SUFFIX);
    PathBuf::from(marker)
}
