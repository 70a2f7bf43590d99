//! Generation-partitioned response store
//!
//! This module holds the persistent side of the stale-while-revalidate cache:
//! request descriptors and response snapshots, cache generations, the storage
//! backends (memory and disk), the generation-scoped `Store`, and the sweeper
//! that deletes superseded generations at activation.

mod disk;
mod generation;
mod snapshot;
mod storage;
mod store;
mod sweep;

pub use disk::DiskStorage;
pub use generation::{
    DEFAULT_CACHE_VERSION, GENERATION_PREFIX, Generation, InvalidGeneration,
};
pub use snapshot::{CacheKey, RequestDescriptor, ResponseSnapshot};
pub use storage::{CacheStorage, MemoryStorage, StoreError};
pub use store::{Partition, Store};
pub use sweep::sweep;
