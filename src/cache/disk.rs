//! Filesystem storage for cached responses
//!
//! Each generation is a directory under the cache root. Every entry is stored
//! as two files named by the key's fingerprint: `<fp>.body` holds the raw
//! body and `<fp>.json` the status, headers, timestamps and a digest of the
//! body. A reader that finds a body not matching its metadata's digest raced a
//! concurrent writer and treats the entry as missing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;
use url::Url;

use super::snapshot::{CacheKey, ResponseSnapshot};
use super::storage::{CacheStorage, StoreError};

/// Metadata written next to each body file
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    /// Cache key the entry was stored under
    key: String,
    /// Final response URL
    url: String,
    /// Response status code
    status: u16,
    /// Response headers
    headers: Vec<(String, String)>,
    /// Hex SHA-256 of the body file this metadata belongs to
    body_sha256: String,
    /// When the response was fetched
    fetched_at: DateTime<Utc>,
    /// When the entry was written
    stored_at: DateTime<Utc>,
}

/// Stores generations as directories on disk
///
/// Uses `~/.cache/stalecache/` on Linux, or the equivalent XDG path on other
/// platforms, unless a directory is given explicitly.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    /// Directory holding one subdirectory per generation
    root: PathBuf,
}

impl DiskStorage {
    /// Creates storage in the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "stalecache")?;
        Some(Self {
            root: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates storage rooted at a custom directory
    pub fn with_dir(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, generation: &str) -> PathBuf {
        self.root.join(generation)
    }

    fn meta_path(&self, generation: &str, key: &CacheKey) -> PathBuf {
        self.generation_dir(generation)
            .join(format!("{}.json", key.fingerprint()))
    }

    fn body_path(&self, generation: &str, key: &CacheKey) -> PathBuf {
        self.generation_dir(generation)
            .join(format!("{}.body", key.fingerprint()))
    }
}

/// Distinguishes temp files of concurrent writers to the same entry
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes via a temp file and rename so readers never see partial content
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(".{}.tmp", TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)));
    let temp_path = path.with_file_name(temp_name);
    fs::write(&temp_path, contents).await?;
    fs::rename(&temp_path, path).await
}

/// Reads a file, mapping "not found" to `None`
async fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn body_digest(body: &[u8]) -> String {
    Sha256::digest(body)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn corrupt(key: &CacheKey, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, generation: &str) -> Result<(), StoreError> {
        fs::create_dir_all(self.generation_dir(generation)).await?;
        Ok(())
    }

    async fn get(
        &self,
        generation: &str,
        key: &CacheKey,
    ) -> Result<Option<ResponseSnapshot>, StoreError> {
        let Some(meta) = read_optional(&self.meta_path(generation, key)).await? else {
            return Ok(None);
        };
        let Some(body) = read_optional(&self.body_path(generation, key)).await? else {
            return Ok(None);
        };

        let meta: EntryMeta = serde_json::from_slice(&meta)?;
        if body_digest(&body) != meta.body_sha256 {
            debug!(%key, "body does not match metadata, entry is being rewritten");
            return Ok(None);
        }
        let url = Url::parse(&meta.url).map_err(|e| corrupt(key, e))?;
        let status = StatusCode::from_u16(meta.status).map_err(|e| corrupt(key, e))?;

        Ok(Some(ResponseSnapshot {
            url,
            status,
            headers: meta.headers,
            body: Bytes::from(body),
            fetched_at: meta.fetched_at,
        }))
    }

    async fn put(
        &self,
        generation: &str,
        key: &CacheKey,
        snapshot: &ResponseSnapshot,
    ) -> Result<(), StoreError> {
        if !fs::try_exists(self.generation_dir(generation)).await? {
            return Err(StoreError::MissingGeneration(generation.to_string()));
        }

        let meta = EntryMeta {
            key: key.to_string(),
            url: snapshot.url.to_string(),
            status: snapshot.status.as_u16(),
            headers: snapshot.headers.clone(),
            body_sha256: body_digest(&snapshot.body),
            fetched_at: snapshot.fetched_at,
            stored_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&meta)?;

        // Body first: metadata is what makes an entry visible to `get`.
        write_atomic(&self.body_path(generation, key), &snapshot.body).await?;
        write_atomic(&self.meta_path(generation, key), &json).await?;
        Ok(())
    }

    async fn generations(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, StoreError> {
        match fs::remove_dir_all(self.generation_dir(generation)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RequestDescriptor;
    use tempfile::TempDir;

    fn create_test_storage() -> (DiskStorage, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let storage = DiskStorage::with_dir(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    fn request() -> RequestDescriptor {
        RequestDescriptor::parse_get("https://example.com/a?q=1").unwrap()
    }

    fn snapshot(body: &'static str) -> ResponseSnapshot {
        let mut snapshot = ResponseSnapshot::new(request().url, StatusCode::OK, body);
        snapshot
            .headers
            .push(("content-type".to_string(), "text/plain".to_string()));
        snapshot
    }

    #[tokio::test]
    async fn test_open_creates_generation_directory() {
        let (storage, temp_dir) = create_test_storage();

        storage.open("cache-v16").await.expect("Open should succeed");
        storage.open("cache-v16").await.expect("Reopen should succeed");

        assert!(temp_dir.path().join("cache-v16").is_dir());
    }

    #[tokio::test]
    async fn test_put_then_get_preserves_snapshot() {
        let (storage, _temp_dir) = create_test_storage();
        let key = request().cache_key();
        let original = snapshot("hello");

        storage.open("cache-v16").await.unwrap();
        storage.put("cache-v16", &key, &original).await.unwrap();

        let stored = storage
            .get("cache-v16", &key)
            .await
            .unwrap()
            .expect("Entry should exist");
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn test_entry_files_are_named_by_fingerprint() {
        let (storage, temp_dir) = create_test_storage();
        let key = request().cache_key();

        storage.open("cache-v16").await.unwrap();
        storage.put("cache-v16", &key, &snapshot("hello")).await.unwrap();

        let dir = temp_dir.path().join("cache-v16");
        assert!(dir.join(format!("{}.json", key.fingerprint())).exists());
        assert!(dir.join(format!("{}.body", key.fingerprint())).exists());
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0, "Temp files should be renamed away");

        let meta = std::fs::read_to_string(dir.join(format!("{}.json", key.fingerprint()))).unwrap();
        assert!(meta.contains("GET https://example.com/a?q=1"));
    }

    #[tokio::test]
    async fn test_body_from_another_write_reads_as_miss() {
        let (storage, temp_dir) = create_test_storage();
        let key = request().cache_key();

        storage.open("cache-v16").await.unwrap();
        storage.put("cache-v16", &key, &snapshot("first")).await.unwrap();
        // Body of a newer write landed, its metadata has not yet
        std::fs::write(
            temp_dir.path().join("cache-v16").join(format!("{}.body", key.fingerprint())),
            "second",
        )
        .unwrap();

        assert!(storage.get("cache-v16", &key).await.unwrap().is_none());

        storage.put("cache-v16", &key, &snapshot("second")).await.unwrap();
        let stored = storage.get("cache-v16", &key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "second");
    }

    #[tokio::test]
    async fn test_get_missing_entry_returns_none() {
        let (storage, _temp_dir) = create_test_storage();

        storage.open("cache-v16").await.unwrap();

        assert!(storage.get("cache-v16", &request().cache_key()).await.unwrap().is_none());
        assert!(storage.get("cache-v99", &request().cache_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_without_open_fails() {
        let (storage, _temp_dir) = create_test_storage();

        let err = storage
            .put("cache-v16", &request().cache_key(), &snapshot("hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::MissingGeneration(_)));
    }

    #[tokio::test]
    async fn test_overwrite_existing_entry() {
        let (storage, _temp_dir) = create_test_storage();
        let key = request().cache_key();

        storage.open("cache-v16").await.unwrap();
        storage.put("cache-v16", &key, &snapshot("first")).await.unwrap();
        storage.put("cache-v16", &key, &snapshot("second")).await.unwrap();

        let stored = storage.get("cache-v16", &key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "second");
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_an_error() {
        let (storage, temp_dir) = create_test_storage();
        let key = request().cache_key();

        storage.open("cache-v16").await.unwrap();
        storage.put("cache-v16", &key, &snapshot("hello")).await.unwrap();
        std::fs::write(
            temp_dir.path().join("cache-v16").join(format!("{}.json", key.fingerprint())),
            "not json",
        )
        .unwrap();

        let err = storage.get("cache-v16", &key).await.unwrap_err();
        assert!(matches!(err, StoreError::Metadata(_)));
    }

    #[tokio::test]
    async fn test_generations_lists_only_directories() {
        let (storage, temp_dir) = create_test_storage();

        storage.open("cache-v15").await.unwrap();
        storage.open("cache-v16").await.unwrap();
        std::fs::write(temp_dir.path().join("stray.txt"), "x").unwrap();

        assert_eq!(
            storage.generations().await.unwrap(),
            vec!["cache-v15".to_string(), "cache-v16".to_string()]
        );
    }

    #[tokio::test]
    async fn test_generations_of_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::with_dir(temp_dir.path().join("nested").join("cache"));

        assert!(storage.generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_generation_removes_directory() {
        let (storage, temp_dir) = create_test_storage();

        storage.open("cache-v15").await.unwrap();
        storage
            .put("cache-v15", &request().cache_key(), &snapshot("old"))
            .await
            .unwrap();

        assert!(storage.delete_generation("cache-v15").await.unwrap());
        assert!(!storage.delete_generation("cache-v15").await.unwrap());
        assert!(!temp_dir.path().join("cache-v15").exists());
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(storage) = DiskStorage::new() {
            let path_str = storage.root().to_string_lossy();
            assert!(
                path_str.contains("stalecache"),
                "Cache path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
