//! Persistence seam for the response store
//!
//! `CacheStorage` is the generation-partitioned key/response container the
//! store persists through. `MemoryStorage` keeps everything in process and is
//! what tests and `--in-memory` runs use; `DiskStorage` lives in `disk.rs`.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use super::snapshot::{CacheKey, ResponseSnapshot};
use crate::lock::{read_lock, write_lock};

/// Errors raised by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored metadata could not be encoded or decoded
    #[error("Cache metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// A stored entry is unreadable (bad URL or status)
    #[error("Corrupt cache entry '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Attempted to persist an unsuccessful response
    #[error("Refusing to cache unsuccessful response ({status})")]
    NotCacheable { status: StatusCode },

    /// The partition was deleted or never opened
    #[error("Cache generation '{0}' is not open")]
    MissingGeneration(String),
}

/// Generation-partitioned key/response container
#[async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    /// Creates the partition if it does not exist yet. Idempotent.
    async fn open(&self, generation: &str) -> Result<(), StoreError>;

    /// Looks up an entry; `Ok(None)` on a miss
    async fn get(&self, generation: &str, key: &CacheKey)
        -> Result<Option<ResponseSnapshot>, StoreError>;

    /// Inserts or overwrites an entry
    async fn put(
        &self,
        generation: &str,
        key: &CacheKey,
        snapshot: &ResponseSnapshot,
    ) -> Result<(), StoreError>;

    /// Names of every existing partition
    async fn generations(&self) -> Result<Vec<String>, StoreError>;

    /// Removes a partition with all of its entries; `Ok(false)` if absent
    async fn delete_generation(&self, generation: &str) -> Result<bool, StoreError>;
}

/// In-process storage backed by nested maps
#[derive(Debug, Default)]
pub struct MemoryStorage {
    partitions: RwLock<BTreeMap<String, HashMap<CacheKey, ResponseSnapshot>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held by a partition, if it exists
    pub fn len(&self, generation: &str) -> Option<usize> {
        read_lock(&self.partitions, "memory.len")
            .get(generation)
            .map(HashMap::len)
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, generation: &str) -> Result<(), StoreError> {
        write_lock(&self.partitions, "memory.open")
            .entry(generation.to_string())
            .or_default();
        Ok(())
    }

    async fn get(
        &self,
        generation: &str,
        key: &CacheKey,
    ) -> Result<Option<ResponseSnapshot>, StoreError> {
        Ok(read_lock(&self.partitions, "memory.get")
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        generation: &str,
        key: &CacheKey,
        snapshot: &ResponseSnapshot,
    ) -> Result<(), StoreError> {
        let mut partitions = write_lock(&self.partitions, "memory.put");
        let entries = partitions
            .get_mut(generation)
            .ok_or_else(|| StoreError::MissingGeneration(generation.to_string()))?;
        entries.insert(key.clone(), snapshot.clone());
        Ok(())
    }

    async fn generations(&self) -> Result<Vec<String>, StoreError> {
        Ok(read_lock(&self.partitions, "memory.generations")
            .keys()
            .cloned()
            .collect())
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, StoreError> {
        Ok(write_lock(&self.partitions, "memory.delete_generation")
            .remove(generation)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn snapshot(body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot::new(Url::parse("https://example.com/a").unwrap(), StatusCode::OK, body)
    }

    fn key() -> CacheKey {
        crate::cache::RequestDescriptor::parse_get("https://example.com/a")
            .unwrap()
            .cache_key()
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = MemoryStorage::new();
        storage.open("cache-v1").await.unwrap();
        storage.put("cache-v1", &key(), &snapshot("X")).await.unwrap();
        storage.open("cache-v1").await.unwrap();

        assert_eq!(storage.len("cache-v1"), Some(1));
        assert_eq!(storage.generations().await.unwrap(), vec!["cache-v1"]);
    }

    #[tokio::test]
    async fn test_get_misses_return_none() {
        let storage = MemoryStorage::new();
        storage.open("cache-v1").await.unwrap();

        assert!(storage.get("cache-v1", &key()).await.unwrap().is_none());
        assert!(storage.get("cache-v2", &key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_last_write_wins() {
        let storage = MemoryStorage::new();
        storage.open("cache-v1").await.unwrap();
        storage.put("cache-v1", &key(), &snapshot("X")).await.unwrap();
        storage.put("cache-v1", &key(), &snapshot("Y")).await.unwrap();

        let stored = storage.get("cache-v1", &key()).await.unwrap().unwrap();
        assert_eq!(stored.text(), "Y");
    }

    #[tokio::test]
    async fn test_put_into_unopened_generation_fails() {
        let storage = MemoryStorage::new();
        let err = storage
            .put("cache-v9", &key(), &snapshot("X"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::MissingGeneration(name) if name == "cache-v9"));
    }

    #[tokio::test]
    async fn test_delete_generation_drops_entries() {
        let storage = MemoryStorage::new();
        storage.open("cache-v1").await.unwrap();
        storage.put("cache-v1", &key(), &snapshot("X")).await.unwrap();

        assert!(storage.delete_generation("cache-v1").await.unwrap());
        assert!(!storage.delete_generation("cache-v1").await.unwrap());
        assert!(storage.generations().await.unwrap().is_empty());
        assert_eq!(storage.len("cache-v1"), None);
    }
}
