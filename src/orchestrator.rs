//! Main orchestration logic for mirroring drive folders and files.

use crate::catalog::{DownloadableFile, RemoteCatalog};
use crate::collect::collect_tree;
use crate::error::DownloadError;
use crate::local::LocalStore;
use crate::resolve::{spawn_resolvers, ResolveOutcome};
use crate::types::{DownloadConfig, RunSummary, TransferOutcome};
use crate::worker::{spawn_downloaders, ResolvedItem};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Downloads every file under the configured remote folder.
///
/// This is the whole-folder entry point. It performs the following steps:
///
/// 1. Resolves the remote folder (or uses `config.parent_id`)
/// 2. Collects the full file list up front
/// 3. Creates every local output directory
/// 4. Runs the metadata and download stages concurrently until each file is
///    accounted for
///
/// Files are written under `config.output` joined with the remote folder's
/// name, mirroring the remote layout below it.
///
/// # Returns
///
/// The per-file outcome counts. Only setup failures (folder resolution,
/// directory creation) are returned as errors; per-file failures are logged
/// and counted.
///
/// # Example
///
/// ```no_run
/// use pikpak_dl::{download_folder, ApiConfig, DownloadConfig, FsStore, PikPakClient};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PikPakClient::new(ApiConfig::with_token("access-token"))?;
/// let config = DownloadConfig::default();
/// download_folder(Arc::new(client), Arc::new(FsStore), &config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn download_folder(
    catalog: Arc<dyn RemoteCatalog>,
    store: Arc<dyn LocalStore>,
    config: &DownloadConfig,
) -> Result<RunSummary, DownloadError> {
    let parent_id = resolve_parent(catalog.as_ref(), config).await?;
    let local_root = local_root(config);
    info!(
        "Collecting files under {} into {}",
        config.remote_path,
        local_root.display()
    );

    let items = collect_tree(catalog.as_ref(), &parent_id, &local_root).await;
    let total = items.len();
    info!("Found {} files to download", total);
    if total == 0 {
        return Ok(RunSummary::default());
    }

    let destinations: BTreeSet<&Path> = items.iter().map(|i| i.destination.as_path()).collect();
    for dir in destinations {
        store.ensure_dir(dir).await.map_err(|e| {
            error!("Create output directory {} failed: {}", dir.display(), e);
            DownloadError::Io(e)
        })?;
    }

    // Every channel holds the full item count, so no producer ever waits on a
    // slow consumer.
    let (pending_tx, pending_rx) = mpsc::channel(total);
    let (resolved_tx, resolved_rx) = mpsc::channel(total);
    let (stage_tx, mut stage_rx) = mpsc::channel(total);
    let (done_tx, mut done_rx) = mpsc::channel(total);

    let resolvers = spawn_resolvers(
        Arc::clone(&catalog),
        config.resolver_workers,
        pending_rx,
        resolved_tx,
        stage_tx,
    );
    let downloaders = spawn_downloaders(
        Arc::clone(&store),
        config.concurrency,
        resolved_rx,
        done_tx,
    );

    for item in items {
        if pending_tx.send(item).await.is_err() {
            break;
        }
    }
    drop(pending_tx);

    let mut summary = RunSummary::default();
    let mut forwarded = 0usize;
    for _ in 0..total {
        match stage_rx.recv().await {
            Some(ResolveOutcome::Forwarded) => forwarded += 1,
            Some(ResolveOutcome::Failed) => summary.record(TransferOutcome::Failed),
            None => {
                warn!("Metadata stage ended before every file was resolved");
                break;
            }
        }
    }
    for _ in 0..forwarded {
        match done_rx.recv().await {
            Some(outcome) => summary.record(outcome),
            None => {
                warn!("Download stage ended before every file was transferred");
                break;
            }
        }
    }

    join_workers(resolvers).await;
    join_workers(downloaders).await;
    log_summary(&summary);
    Ok(summary)
}

/// Downloads an explicit list of files, each given relative to the configured
/// remote folder, into `config.output`.
///
/// Paths are resolved one at a time on the calling task; transfers run on
/// the download pool. A path that cannot be resolved is logged and counted as
/// failed without a transfer attempt.
pub async fn download_files(
    catalog: Arc<dyn RemoteCatalog>,
    store: Arc<dyn LocalStore>,
    config: &DownloadConfig,
    paths: &[String],
) -> Result<RunSummary, DownloadError> {
    let parent_id = resolve_parent(catalog.as_ref(), config).await?;

    store.ensure_dir(&config.output).await.map_err(|e| {
        error!(
            "Create output directory {} failed: {}",
            config.output.display(),
            e
        );
        DownloadError::Io(e)
    })?;

    let total = paths.len();
    if total == 0 {
        return Ok(RunSummary::default());
    }

    let (file_tx, file_rx) = mpsc::channel(config.concurrency.max(1));
    let (done_tx, mut done_rx) = mpsc::channel(total);
    let downloaders = spawn_downloaders(
        Arc::clone(&store),
        config.concurrency,
        file_rx,
        done_tx.clone(),
    );

    for path in paths {
        let file = match open_path(catalog.as_ref(), &parent_id, path).await {
            Ok(file) => file,
            Err(e) => {
                error!("{} get file failed: {}", path, e);
                let _ = done_tx.send(TransferOutcome::Failed).await;
                continue;
            }
        };
        let item = ResolvedItem {
            file,
            destination: config.output.clone(),
        };
        if file_tx.send(item).await.is_err() {
            error!("Download stage closed before {} was queued", path);
            let _ = done_tx.send(TransferOutcome::Failed).await;
        }
    }
    drop(file_tx);
    drop(done_tx);

    let mut summary = RunSummary::default();
    for _ in 0..total {
        match done_rx.recv().await {
            Some(outcome) => summary.record(outcome),
            None => {
                warn!("Download stage ended before every file was accounted for");
                break;
            }
        }
    }

    join_workers(downloaders).await;
    log_summary(&summary);
    Ok(summary)
}

async fn resolve_parent(
    catalog: &dyn RemoteCatalog,
    config: &DownloadConfig,
) -> Result<String, DownloadError> {
    if let Some(id) = &config.parent_id {
        return Ok(id.clone());
    }
    catalog
        .resolve_folder_id(&config.remote_path)
        .await
        .inspect_err(|e| error!("Get parent folder id failed: {}", e))
}

async fn open_path(
    catalog: &dyn RemoteCatalog,
    parent_id: &str,
    path: &str,
) -> Result<DownloadableFile, DownloadError> {
    let stat = catalog.resolve_file_stat(parent_id, path).await?;
    catalog.open_file(&stat.id).await
}

/// `output` joined with the last component of the remote path; the drive
/// root maps to `output` itself.
fn local_root(config: &DownloadConfig) -> PathBuf {
    match crate::catalog::path_components(&config.remote_path).last() {
        Some(name) => config.output.join(name),
        None => config.output.clone(),
    }
}

async fn join_workers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }
}

fn log_summary(summary: &RunSummary) {
    info!(
        "Finished: {} downloaded, {} skipped, {} failed",
        summary.downloaded, summary.skipped, summary.failed
    );
}
