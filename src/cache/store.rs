//! Generation-scoped view over a `CacheStorage`
//!
//! `Store::open` hands out a `Partition` bound to one generation. Partitions
//! are cheap to clone and are what the interceptor and refresher share.

use std::sync::Arc;

use tracing::debug;

use super::generation::Generation;
use super::snapshot::{RequestDescriptor, ResponseSnapshot};
use super::storage::{CacheStorage, StoreError};

/// Entry point to the persistent response cache
#[derive(Debug)]
pub struct Store<S> {
    storage: Arc<S>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: CacheStorage> Store<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// The underlying storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the partition for a generation, creating it if absent
    pub async fn open(&self, generation: &Generation) -> Result<Partition<S>, StoreError> {
        let name = generation.name();
        self.storage.open(&name).await?;
        Ok(Partition {
            storage: Arc::clone(&self.storage),
            name,
        })
    }

    /// Names of every stored generation, current or not
    pub async fn generations(&self) -> Result<Vec<String>, StoreError> {
        self.storage.generations().await
    }

    /// Deletes a whole generation; returns whether it existed
    pub async fn delete_generation(&self, name: &str) -> Result<bool, StoreError> {
        self.storage.delete_generation(name).await
    }
}

/// Handle to one open generation
#[derive(Debug)]
pub struct Partition<S> {
    storage: Arc<S>,
    name: String,
}

impl<S> Clone for Partition<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            name: self.name.clone(),
        }
    }
}

impl<S: CacheStorage> Partition<S> {
    /// Generation name this partition belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up the snapshot stored for a request
    pub async fn get(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Option<ResponseSnapshot>, StoreError> {
        self.storage.get(&self.name, &request.cache_key()).await
    }

    /// Stores a snapshot for a request, overwriting any previous one.
    ///
    /// Unsuccessful snapshots are rejected with `StoreError::NotCacheable`.
    pub async fn put(
        &self,
        request: &RequestDescriptor,
        snapshot: &ResponseSnapshot,
    ) -> Result<(), StoreError> {
        if !snapshot.ok() {
            return Err(StoreError::NotCacheable {
                status: snapshot.status,
            });
        }

        let key = request.cache_key();
        debug!(generation = %self.name, key = %key, "writing cache entry");
        self.storage.put(&self.name, &key, snapshot).await
    }
}
