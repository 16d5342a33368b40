//! pikpak-dl - Concurrent, resumable mirroring of PikPak drive folders
//!
//! This library walks a remote folder tree and replicates it onto local
//! storage, resolving and downloading many files at once. Interrupted runs
//! pick up where they left off: a zero-byte `<file>.pikpakclidownload`
//! marker sits beside every file whose transfer has started but not yet
//! finished, and such files are fetched again on the next run.
//!
//! # Features
//!
//! - **Whole-folder mirroring**: Recursively collect and download a folder tree
//! - **Explicit file lists**: Download selected files relative to a folder
//! - **Resumable Runs**: Completed files are skipped, interrupted ones retried
//! - **Two-stage pipeline**: Metadata resolution and transfers run concurrently
//! - **Integrity checks**: Transferred bytes are checked against size and MD5
//!
//! # Example
//!
//! ```no_run
//! use pikpak_dl::{download_folder, ApiConfig, DownloadConfig, FsStore, PikPakClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PikPakClient::new(ApiConfig::with_token("access-token"))?;
//! client.authenticate().await?;
//!
//! let config = DownloadConfig {
//!     concurrency: 4,
//!     remote_path: "/Movies".to_string(),
//!     ..DownloadConfig::default()
//! };
//! let summary = download_folder(Arc::new(client), Arc::new(FsStore), &config).await?;
//! println!("{} downloaded, {} skipped", summary.downloaded, summary.skipped);
//! # Ok(())
//! # }
//! ```

mod catalog;
mod collect;
mod download;
mod error;
mod local;
mod orchestrator;
mod pikpak;
mod resolve;
mod types;
mod worker;

#[cfg(test)]
mod test_support;

pub use catalog::{ContentSource, DownloadableFile, RemoteCatalog};
pub use collect::collect_tree;
pub use error::DownloadError;
pub use local::{FsStore, LocalStore};
pub use orchestrator::{download_files, download_folder};
pub use pikpak::{ApiConfig, PikPakClient, DEFAULT_API_URL};
pub use resolve::{spawn_resolvers, ResolveOutcome};
pub use types::{
    marker_path, DownloadConfig, EntryKind, PendingItem, RemoteEntry, RunSummary,
    TransferOutcome, MARKER_SUFFIX, ROOT_FOLDER_ID,
};
pub use worker::{download_one, spawn_downloaders, ResolvedItem};
