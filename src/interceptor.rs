//! Stale-while-revalidate request interceptor
//!
//! Every outgoing request goes through `Interceptor::handle`. A request with a
//! stored snapshot is answered from the store (a hit); anything else goes to
//! the network (a miss). Either way a background refresh is scheduled once the
//! answer is ready, and the caller never waits for it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument};

use crate::cache::{
    sweep, CacheStorage, Generation, RequestDescriptor, ResponseSnapshot, Store, StoreError,
};
use crate::fetch::{FetchError, Fetcher};
use crate::refresh::{spawn_refresh, PendingRefreshes, RefreshSource, RefreshTask, Refresher};

/// Startup parameters of an interceptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterceptorConfig {
    /// Generation all reads and writes go to
    pub generation: Generation,
}

impl InterceptorConfig {
    pub fn new(generation: Generation) -> Self {
        Self { generation }
    }
}

/// Errors surfaced to the caller of `handle`
#[derive(Debug, Error)]
pub enum InterceptError {
    /// The network fetch for a miss failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The store could not be read
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the store without touching the network
    Hit,
    /// Fetched from the network
    Miss,
}

/// A response handed back by the interceptor, with its background refresh
#[derive(Debug)]
pub struct Served {
    /// The response for the caller
    pub response: ResponseSnapshot,
    /// Whether the response came from the store
    pub outcome: Outcome,
    /// The refresh scheduled after serving
    pub refresh: RefreshTask,
}

struct Shared<F, S> {
    fetcher: Arc<F>,
    store: Store<S>,
    generation: Generation,
    pending: Arc<PendingRefreshes>,
}

/// Serves requests from the store or the network and keeps the store fresh
pub struct Interceptor<F, S> {
    shared: Arc<Shared<F, S>>,
}

impl<F, S> Clone for Interceptor<F, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: Fetcher, S: CacheStorage> Interceptor<F, S> {
    pub fn new(config: InterceptorConfig, fetcher: F, storage: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher: Arc::new(fetcher),
                store: Store::new(storage),
                generation: config.generation,
                pending: Arc::new(PendingRefreshes::new()),
            }),
        }
    }

    pub fn generation(&self) -> Generation {
        self.shared.generation
    }

    pub fn store(&self) -> &Store<S> {
        &self.shared.store
    }

    /// Install lifecycle event; only logs
    pub fn install(&self) {
        info!(generation = %self.shared.generation, "Installing");
    }

    /// Activate lifecycle event: deletes every non-current generation.
    ///
    /// Activation is complete once the returned future resolves.
    pub async fn activate(&self) -> Result<Vec<String>, StoreError> {
        info!(generation = %self.shared.generation, "Clearing old caches");
        sweep(&self.shared.store, &self.shared.generation).await
    }

    /// Answers a request and schedules its background refresh
    #[instrument(skip_all, fields(method = %request.method, url = %request.url, generation = %self.shared.generation))]
    pub async fn handle(&self, request: RequestDescriptor) -> Result<Served, InterceptError> {
        let partition = self.shared.store.open(&self.shared.generation).await?;

        let (response, outcome, source) = match partition.get(&request).await? {
            Some(cached) => {
                info!("Found cached resource for {}", request.url);
                (cached, Outcome::Hit, RefreshSource::Cached)
            }
            None => {
                info!("No cached resource found for {}. Fetching", request.url);
                let fresh = self.shared.fetcher.fetch(&request).await?;
                let copy = fresh.clone();
                (fresh, Outcome::Miss, RefreshSource::Fetched(copy))
            }
        };

        let refresher = Refresher::new(Arc::clone(&self.shared.fetcher), partition);
        let refresh = spawn_refresh(refresher, request, source, &self.shared.pending);

        Ok(Served {
            response,
            outcome,
            refresh,
        })
    }

    /// Number of background refreshes still running
    pub fn pending_refreshes(&self) -> usize {
        self.shared.pending.len()
    }

    /// Waits for every background refresh scheduled so far to finish
    pub async fn wait_idle(&self) {
        self.shared.pending.wait_idle().await
    }
}

/// Lets any `Fetcher` client be cached transparently
#[async_trait]
impl<F: Fetcher, S: CacheStorage> Fetcher for Interceptor<F, S> {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, FetchError> {
        match self.handle(request.clone()).await {
            Ok(served) => Ok(served.response),
            Err(InterceptError::Fetch(e)) => Err(e),
            Err(InterceptError::Store(e)) => Err(FetchError::Cache(e)),
        }
    }
}
