//! Corpus loading before a run.
//!
//! A fixed pool of writer workers drains generated documents from a channel
//! and writes them through the store. Any write error is fatal for setup.
//! This is a separate concurrency regime from the run itself: the pool is
//! contract-fixed at 2000 writers regardless of user count, and it finishes
//! before the first runner starts.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{Error, StoreError};
use crate::store::DocumentStore;
use crate::workload::{Document, Workload};

/// Size of the writer pool used for the initial document load.
pub const LOAD_WORKERS: usize = 2000;

/// Settle time between setup finishing and control returning to the caller.
const WARMUP_PAUSE: Duration = Duration::from_secs(5);

/// Generate and write `num_items` documents with ids `0 … num_items-1`, run
/// the workload's own setup hook, then pause briefly before returning.
pub async fn run(
    workload: Arc<dyn Workload>,
    store: Arc<dyn DocumentStore>,
    num_items: u64,
) -> Result<(), Error> {
    info!(num_items, "loading initial corpus");

    let (tx, rx) = mpsc::channel::<Document>(LOAD_WORKERS);
    let rx = Arc::new(Mutex::new(rx));

    let writers: Vec<JoinHandle<Result<(), StoreError>>> = (0..LOAD_WORKERS)
        .map(|_| {
            let rx = rx.clone();
            let store = store.clone();
            tokio::spawn(async move {
                loop {
                    let doc = { rx.lock().await.recv().await };
                    match doc {
                        Some(doc) => {
                            if let Err(e) = store.upsert(&doc.name, doc.data).await {
                                // Closing the channel unblocks the producer
                                // so the error surfaces immediately.
                                rx.lock().await.close();
                                return Err(e);
                            }
                        }
                        None => return Ok(()),
                    }
                }
            })
        })
        .collect();

    for id in 0..num_items {
        if tx.send(workload.generate_document(id)).await.is_err() {
            // A writer hit a fatal error and closed the channel.
            break;
        }
    }
    drop(tx);

    for joined in join_all(writers).await {
        joined.expect("writer task panicked")?;
    }

    info!("running workload setup");
    workload.setup().await?;

    tokio::time::sleep(WARMUP_PAUSE).await;
    Ok(())
}
