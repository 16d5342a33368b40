//! Metadata resolution stage: turns listed files into download handles.

use crate::catalog::RemoteCatalog;
use crate::types::PendingItem;
use crate::worker::ResolvedItem;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Completion signal emitted once per consumed [`PendingItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// A handle was sent on to the download stage.
    Forwarded,
    /// The handle could not be resolved; nothing was sent on.
    Failed,
}

/// Spawns `workers` resolver tasks sharing `input`.
///
/// Each task opens one file per received item, forwards the handle on
/// `output`, and reports on `done`. Tasks exit once `input` is closed and
/// drained, dropping their `output` senders so the next stage can finish.
pub fn spawn_resolvers(
    catalog: Arc<dyn RemoteCatalog>,
    workers: usize,
    input: mpsc::Receiver<PendingItem>,
    output: mpsc::Sender<ResolvedItem>,
    done: mpsc::Sender<ResolveOutcome>,
) -> Vec<JoinHandle<()>> {
    let input = Arc::new(Mutex::new(input));

    (0..workers.max(1))
        .map(|worker_id| {
            let catalog = Arc::clone(&catalog);
            let input = Arc::clone(&input);
            let output = output.clone();
            let done = done.clone();

            tokio::spawn(async move {
                loop {
                    let next = input.lock().await.recv().await;
                    let Some(item) = next else {
                        break;
                    };

                    let outcome = resolve_one(catalog.as_ref(), item, &output).await;
                    if done.send(outcome).await.is_err() {
                        break;
                    }
                }
                debug!("Resolver {} finished", worker_id);
            })
        })
        .collect()
}

async fn resolve_one(
    catalog: &dyn RemoteCatalog,
    item: PendingItem,
    output: &mpsc::Sender<ResolvedItem>,
) -> ResolveOutcome {
    let file = match catalog.open_file(&item.entry.id).await {
        Ok(file) => file,
        Err(e) => {
            error!("Get file {} failed: {}", item.entry.name, e);
            return ResolveOutcome::Failed;
        }
    };

    let resolved = ResolvedItem {
        file,
        destination: item.destination,
    };
    match output.send(resolved).await {
        Ok(()) => ResolveOutcome::Forwarded,
        Err(_) => {
            error!("Download stage closed before {} was queued", item.entry.name);
            ResolveOutcome::Failed
        }
    }
}
