//! Download stage: the skip-aware, marker-guarded transfer of resolved files.

use crate::catalog::DownloadableFile;
use crate::local::LocalStore;
use crate::types::{marker_path, TransferOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A download handle paired with the local directory it is written into.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub file: DownloadableFile,
    pub destination: PathBuf,
}

/// Spawns `workers` download tasks sharing `input`.
///
/// Every received item produces exactly one message on `done`, whichever
/// branch of [`download_one`] it takes. Tasks exit once `input` is closed and
/// drained.
pub fn spawn_downloaders(
    store: Arc<dyn LocalStore>,
    workers: usize,
    input: mpsc::Receiver<ResolvedItem>,
    done: mpsc::Sender<TransferOutcome>,
) -> Vec<JoinHandle<()>> {
    let input = Arc::new(Mutex::new(input));

    (0..workers.max(1))
        .map(|worker_id| {
            let store = Arc::clone(&store);
            let input = Arc::clone(&input);
            let done = done.clone();

            tokio::spawn(async move {
                loop {
                    let next = input.lock().await.recv().await;
                    let Some(item) = next else {
                        break;
                    };

                    let outcome = download_one(store.as_ref(), &item.file, &item.destination).await;
                    if done.send(outcome).await.is_err() {
                        break;
                    }
                }
                debug!("Download worker {} finished", worker_id);
            })
        })
        .collect()
}

/// Downloads one file into `destination` unless a complete copy is already there.
///
/// A file counts as complete when it exists and has no marker beside it. The
/// marker is created before the transfer starts and removed only after it
/// succeeds, so an interrupted or failed transfer is retried on the next run.
pub async fn download_one(
    store: &dyn LocalStore,
    file: &DownloadableFile,
    destination: &Path,
) -> TransferOutcome {
    let path = destination.join(&file.name);
    let marker = marker_path(&path);

    let exists = match store.exists(&path).await {
        Ok(exists) => exists,
        Err(e) => {
            error!("Access {} failed: {}", path.display(), e);
            return TransferOutcome::Failed;
        }
    };
    let has_marker = match store.exists(&marker).await {
        Ok(has_marker) => has_marker,
        Err(e) => {
            error!("Access {} failed: {}", marker.display(), e);
            return TransferOutcome::Failed;
        }
    };

    if exists && !has_marker {
        info!("Skip downloaded file {}", file.name);
        return TransferOutcome::Skipped;
    }
    if has_marker {
        info!("Resuming interrupted download of {}", file.name);
    }

    if let Err(e) = store.create_marker(&marker).await {
        error!("Create flag file {} failed: {}", marker.display(), e);
        return TransferOutcome::Failed;
    }

    match file.transfer(&path).await {
        Ok(bytes) => {
            info!("Download {} success ({} bytes)", file.name, bytes);
            if let Err(e) = store.remove_marker(&marker).await {
                warn!("Remove flag file {} failed: {}", marker.display(), e);
            }
            TransferOutcome::Downloaded
        }
        Err(e) => {
            error!("Download {} failed: {}", file.name, e);
            TransferOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RemoteCatalog;
    use crate::local::FsStore;
    use crate::test_support::{FailOn, FailingStore, MemoryCatalog};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .file("", "f-1", "movie.mkv", b"0123456789")
            .file("", "f-bad", "broken.bin", b"abcdefgh")
            .break_transfer("f-bad")
    }

    #[tokio::test]
    async fn fresh_file_is_downloaded_and_marker_removed() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let file = catalog.open_file("f-1").await.unwrap();

        let outcome = download_one(&FsStore, &file, dir.path()).await;

        let path = dir.path().join("movie.mkv");
        assert_eq!(outcome, TransferOutcome::Downloaded);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");
        assert!(!marker_path(&path).exists());
        assert_eq!(catalog.transfers(), 1);
    }

    #[tokio::test]
    async fn complete_file_without_marker_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        std::fs::write(&path, b"previous run").unwrap();
        let catalog = catalog();
        let file = catalog.open_file("f-1").await.unwrap();

        let outcome = download_one(&FsStore, &file, dir.path()).await;

        assert_eq!(outcome, TransferOutcome::Skipped);
        assert_eq!(std::fs::read(&path).unwrap(), b"previous run");
        assert_eq!(catalog.transfers(), 0);
    }

    #[tokio::test]
    async fn file_with_leftover_marker_is_transferred_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        std::fs::write(&path, b"01234").unwrap();
        std::fs::write(marker_path(&path), b"").unwrap();
        let catalog = catalog();
        let file = catalog.open_file("f-1").await.unwrap();

        let outcome = download_one(&FsStore, &file, dir.path()).await;

        assert_eq!(outcome, TransferOutcome::Downloaded);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");
        assert!(!marker_path(&path).exists());
        assert_eq!(catalog.transfers(), 1);
    }

    #[tokio::test]
    async fn failed_transfer_keeps_marker_for_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let file = catalog.open_file("f-bad").await.unwrap();

        let outcome = download_one(&FsStore, &file, dir.path()).await;

        let path = dir.path().join("broken.bin");
        assert_eq!(outcome, TransferOutcome::Failed);
        assert!(path.exists());
        assert!(marker_path(&path).exists());

        // The partial file must not be mistaken for a finished one.
        let retry = download_one(&FsStore, &file, dir.path()).await;
        assert_eq!(retry, TransferOutcome::Failed);
        assert_eq!(catalog.transfers(), 2);
    }

    #[tokio::test]
    async fn existence_check_error_skips_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let file = catalog.open_file("f-1").await.unwrap();
        let store = FailingStore {
            fail_on: FailOn::Exists,
        };

        let outcome = download_one(&store, &file, dir.path()).await;

        assert_eq!(outcome, TransferOutcome::Failed);
        assert_eq!(catalog.transfers(), 0);
    }

    #[tokio::test]
    async fn marker_creation_error_skips_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let file = catalog.open_file("f-1").await.unwrap();
        let store = FailingStore {
            fail_on: FailOn::CreateMarker,
        };

        let outcome = download_one(&store, &file, dir.path()).await;

        assert_eq!(outcome, TransferOutcome::Failed);
        assert!(!dir.path().join("movie.mkv").exists());
        assert_eq!(catalog.transfers(), 0);
    }

    #[tokio::test]
    async fn marker_removal_error_still_counts_as_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let file = catalog.open_file("f-1").await.unwrap();
        let store = FailingStore {
            fail_on: FailOn::RemoveMarker,
        };

        let outcome = download_one(&store, &file, dir.path()).await;

        let path = dir.path().join("movie.mkv");
        assert_eq!(outcome, TransferOutcome::Downloaded);
        // A stale marker only forces one extra download next time.
        assert!(marker_path(&path).exists());
    }

    #[tokio::test]
    async fn pool_signals_once_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let (file_tx, file_rx) = mpsc::channel(2);
        let (done_tx, mut done_rx) = mpsc::channel(2);
        let handles = spawn_downloaders(Arc::new(FsStore), 3, file_rx, done_tx);

        for id in ["f-1", "f-bad"] {
            let item = ResolvedItem {
                file: catalog.open_file(id).await.unwrap(),
                destination: dir.path().to_path_buf(),
            };
            file_tx.send(item).await.unwrap();
        }
        drop(file_tx);

        let mut outcomes = Vec::new();
        while let Some(outcome) = done_rx.recv().await {
            outcomes.push(outcome);
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&TransferOutcome::Downloaded));
        assert!(outcomes.contains(&TransferOutcome::Failed));
    }
}
