//! Generation sweeper
//!
//! Runs once at activation and deletes every generation other than the current
//! one. A superseded generation is never read again, so there is no grace
//! period.

use tracing::info;

use super::generation::Generation;
use super::storage::{CacheStorage, StoreError};
use super::store::Store;

/// Deletes every generation except `current`, returning the removed names.
///
/// The first failed deletion aborts the remaining ones for this sweep.
pub async fn sweep<S: CacheStorage>(
    store: &Store<S>,
    current: &Generation,
) -> Result<Vec<String>, StoreError> {
    let current = current.name();
    let mut cleared = Vec::new();

    for name in store.generations().await? {
        if name == current {
            continue;
        }
        store.delete_generation(&name).await?;
        info!(generation = %current, cleared = %name, "Cleared {}", name);
        cleared.push(name);
    }

    Ok(cleared)
}
