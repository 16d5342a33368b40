//! Recursive enumeration of a remote folder tree.

use crate::catalog::RemoteCatalog;
use crate::types::{EntryKind, PendingItem};
use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Walks the tree under `root_id` depth-first and returns every file in it.
///
/// Each file is paired with the local directory mirroring its remote parent,
/// rooted at `destination`. A folder whose listing fails is logged and
/// skipped; the rest of the tree is still collected.
pub async fn collect_tree<C>(catalog: &C, root_id: &str, destination: &Path) -> Vec<PendingItem>
where
    C: RemoteCatalog + ?Sized,
{
    let mut items = Vec::new();
    collect_into(
        catalog,
        root_id.to_string(),
        destination.to_path_buf(),
        &mut items,
    )
    .await;
    items
}

fn collect_into<'a, C>(
    catalog: &'a C,
    folder_id: String,
    destination: PathBuf,
    items: &'a mut Vec<PendingItem>,
) -> BoxFuture<'a, ()>
where
    C: RemoteCatalog + ?Sized + 'a,
{
    async move {
        let entries = match catalog.list_folder(&folder_id).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(
                    "Failed to list folder {:?} ({}): {}",
                    folder_id,
                    destination.display(),
                    e
                );
                return;
            }
        };
        debug!(
            "Listed {} entries under {}",
            entries.len(),
            destination.display()
        );

        for entry in entries {
            match entry.kind {
                EntryKind::Folder => {
                    let child = destination.join(&entry.name);
                    collect_into(catalog, entry.id, child, items).await;
                }
                EntryKind::File => items.push(PendingItem {
                    entry,
                    destination: destination.clone(),
                }),
            }
        }
    }
    .boxed()
}
