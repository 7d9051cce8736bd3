//! Concurrent fetch of changed objects.
//!
//! One task per changed key fans out, a single collector fans results back
//! in. The first retrieval error fails the whole call, but every in-flight
//! worker is drained before returning so no response body or connection is
//! leaked; the pending cache entry for each completed fetch is recorded by
//! the worker that finished it.

use std::sync::Arc;

use tokio::sync::mpsc;

use gitrelay_core::{EncryptedBundle, PendingWriter, RemoteObject};

use crate::error::SyncError;
use crate::store::ObjectStore;

/// Retrieve the bytes of every changed object, in parallel.
///
/// An empty changed set returns an empty result without contacting the
/// store. On error the returned `Err` is the first failure observed by the
/// collector; successfully fetched siblings are discarded.
pub async fn fetch_changed<S: ObjectStore>(
    store: &Arc<S>,
    changed: &[RemoteObject],
    pending: PendingWriter,
) -> Result<Vec<EncryptedBundle>, SyncError> {
    if changed.is_empty() {
        return Ok(Vec::new());
    }

    let (tx, mut rx) = mpsc::channel::<Result<EncryptedBundle, SyncError>>(changed.len());

    for object in changed {
        let store = Arc::clone(store);
        let pending = pending.clone();
        let object = object.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = store.get(&object.key).await.map(|ciphertext| {
                pending.record(&object.key, object.last_modified);
                EncryptedBundle {
                    key: object.key,
                    ciphertext,
                }
            });
            // Receiver may have stopped caring after a sibling's error.
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut bundles = Vec::with_capacity(changed.len());
    let mut first_error: Option<SyncError> = None;
    while let Some(result) = rx.recv().await {
        match result {
            Ok(bundle) => bundles.push(bundle),
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    tracing::debug!(error = %err, "additional fetch failure after first error");
                }
            }
        }
    }

    match first_error {
        None => Ok(bundles),
        Some(err) => Err(err),
    }
}
