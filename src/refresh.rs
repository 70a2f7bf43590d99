//! Background refresh of cached responses
//!
//! After the interceptor has answered a request it spawns a refresh task for
//! the same request. On a miss the task persists the response the serve path
//! already fetched; on a hit it fetches a fresh copy. Failures never reach the
//! caller: they are logged and reported through `RefreshOutcome`.
//!
//! Every spawned task is tracked by `PendingRefreshes` so a host can wait for
//! outstanding work before shutting down.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStorage, Partition, RequestDescriptor, ResponseSnapshot};
use crate::fetch::Fetcher;

/// What the serve path already knows when a refresh is scheduled
#[derive(Debug, Clone)]
pub enum RefreshSource {
    /// The request was served from the store; a new fetch is needed
    Cached,
    /// The serve path fetched this response and it can be stored as-is
    Fetched(ResponseSnapshot),
}

/// How a refresh task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A successful response was written to the store
    Stored { status: StatusCode },
    /// The response was unsuccessful and was not written
    Discarded { status: StatusCode },
    /// The fetch or the write failed
    Failed(String),
    /// The task was cancelled or panicked before finishing
    Abandoned,
}

impl RefreshOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, RefreshOutcome::Stored { .. })
    }
}

/// Refreshes store entries for one generation
pub struct Refresher<F, S> {
    fetcher: Arc<F>,
    partition: Partition<S>,
}

impl<F: Fetcher, S: CacheStorage> Refresher<F, S> {
    pub fn new(fetcher: Arc<F>, partition: Partition<S>) -> Self {
        Self { fetcher, partition }
    }

    /// Makes sure the store holds a fresh successful snapshot for `request`
    pub async fn refresh(
        &self,
        request: &RequestDescriptor,
        source: RefreshSource,
    ) -> RefreshOutcome {
        let snapshot = match source {
            RefreshSource::Fetched(snapshot) => snapshot,
            RefreshSource::Cached => {
                debug!(url = %request.url, "revalidating cached resource");
                match self.fetcher.fetch(request).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        warn!(url = %request.url, error = %e, "background refresh fetch failed");
                        return RefreshOutcome::Failed(e.to_string());
                    }
                }
            }
        };

        self.store_if_ok(request, &snapshot).await
    }

    async fn store_if_ok(
        &self,
        request: &RequestDescriptor,
        snapshot: &ResponseSnapshot,
    ) -> RefreshOutcome {
        if !snapshot.ok() {
            debug!(url = %request.url, status = snapshot.status.as_u16(), "not caching unsuccessful response");
            return RefreshOutcome::Discarded {
                status: snapshot.status,
            };
        }

        info!(generation = %self.partition.name(), "Storing resource {} in cache", request.url);
        match self.partition.put(request, snapshot).await {
            Ok(()) => RefreshOutcome::Stored {
                status: snapshot.status,
            },
            Err(e) => {
                warn!(url = %request.url, error = %e, "failed to store refreshed response");
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Counts refresh tasks that have not finished yet
#[derive(Debug, Default)]
pub struct PendingRefreshes {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingRefreshes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh tasks still running
    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until every tracked task has finished
    pub async fn wait_idle(&self) {
        loop {
            // Register before checking so a completion in between is not missed.
            let notified = self.idle.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn track(self: &Arc<Self>) -> PendingGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        PendingGuard {
            pending: Arc::clone(self),
        }
    }
}

/// Decrements the pending count when a task ends, however it ends
struct PendingGuard {
    pending: Arc<PendingRefreshes>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.pending.idle.notify_waiters();
        }
    }
}

/// Handle to a spawned refresh task
///
/// Dropping it detaches the task; it keeps running and stays tracked by the
/// interceptor's `PendingRefreshes`.
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<RefreshOutcome>,
}

impl RefreshTask {
    /// Waits for the refresh to finish and reports how it ended
    pub async fn settled(self) -> RefreshOutcome {
        self.handle.await.unwrap_or(RefreshOutcome::Abandoned)
    }
}

/// Spawns a tracked refresh task on the current tokio runtime
pub fn spawn_refresh<F: Fetcher, S: CacheStorage>(
    refresher: Refresher<F, S>,
    request: RequestDescriptor,
    source: RefreshSource,
    pending: &Arc<PendingRefreshes>,
) -> RefreshTask {
    let guard = pending.track();
    let handle = tokio::spawn(async move {
        let _guard = guard;
        refresher.refresh(&request, source).await
    });
    RefreshTask { handle }
}
