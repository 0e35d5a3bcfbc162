//! Bounded fan-out executor
//!
//! Launches one task per work item under a fixed concurrency ceiling and
//! joins them all before returning. Results come back in input order
//! regardless of completion order.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Run `worker` once per item, admission-gated to at most `max_concurrency`
/// simultaneous executions.
///
/// The worker receives the item's 0-based input index and the item itself.
/// All tasks complete before this returns; a task that panics yields an
/// `Err` with the join error's message instead of aborting the batch.
pub async fn run_bounded<I, T, F, Fut>(
    items: Vec<I>,
    max_concurrency: usize,
    worker: F,
) -> Vec<std::result::Result<T, String>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(usize, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    debug!(
        items = items.len(),
        max_concurrency, "Starting bounded fan-out"
    );

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let worker = Arc::new(worker);

    let mut handles = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let worker = Arc::clone(&worker);
        handles.push(tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails if the
            // executor itself is torn down; run ungated in that case.
            let _permit = semaphore.acquire_owned().await.ok();
            worker(index, item).await
        }));
    }

    // Join barrier: awaiting handles in spawn order reassembles results by
    // input position, not completion time.
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.map_err(|e| e.to_string()));
    }
    results
}
