#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Vendor store for deskbuild
//!
//! The store materializes locked build-time dependencies into a local,
//! network-independent cache so that the prepare and build stages never
//! touch the network. The cache is append-only and keyed by
//! `(name, version)`; concurrent fetches of one key deduplicate to a
//! single in-flight fetch. The store is always an explicit, injected
//! value, never a process-wide singleton.

mod index;

pub use index::{lock_dependencies, Candidate, DependencyIndex, InMemoryIndex, RunIndex};

use dashmap::DashMap;
use deskbuild_errors::{Error, StoreError};
use deskbuild_types::{Version, VendorLock};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Cache key: one fetched dependency snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VendorKey {
    pub name: String,
    pub version: Version,
}

impl VendorKey {
    fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// A dependency materialized in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorEntry {
    /// Directory holding the fetched content
    pub path: PathBuf,
    /// blake3 hex digest of the content
    pub hash: String,
}

/// Everything one component needs for an offline build
#[derive(Debug, Clone)]
pub struct VendorDir {
    /// Cache root exposed to build commands
    pub root: PathBuf,
    /// name -> materialized entry, in name order
    pub entries: BTreeMap<String, VendorEntry>,
}

/// Source of dependency content
///
/// The only part of vendoring that may touch the network. Injected so the
/// orchestrator stays offline-testable.
pub trait Fetcher: Send + Sync {
    /// Fetch the content of one dependency version
    fn fetch<'a>(
        &'a self,
        name: &'a str,
        version: &'a Version,
    ) -> BoxFuture<'a, Result<Vec<u8>, Error>>;
}

/// Append-only, hash-verified dependency cache
pub struct VendorStore {
    root: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    // Pending-request table: one cell per key, so a second requester waits
    // on the first fetch instead of re-fetching. Failed fetches stay cached
    // for the rest of the run; partial vendor state is never reused
    // silently.
    inflight: DashMap<VendorKey, Arc<OnceCell<Result<VendorEntry, StoreError>>>>,
}

impl VendorStore {
    /// Create a store rooted at `root` with the given fetcher
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
            inflight: DashMap::new(),
        }
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Materialize every entry of a vendor lock into the cache
    ///
    /// After this returns, the component's prepare and build stages can run
    /// without network access.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::FetchFailed` if any fetch fails (surfaced
    /// immediately, never retried automatically) or
    /// `StoreError::HashMismatch` if fetched content does not match the
    /// lock's pin.
    pub async fn materialize(&self, lock: &VendorLock) -> Result<VendorDir, Error> {
        let mut entries = BTreeMap::new();
        for (name, pinned) in &lock.entries {
            let key = VendorKey {
                name: name.clone(),
                version: pinned.version.clone(),
            };
            let entry = self.get_or_fetch(&key, &pinned.hash).await?;
            entries.insert(name.clone(), entry);
        }

        Ok(VendorDir {
            root: self.root.clone(),
            entries,
        })
    }

    /// Place locally produced content into the cache without a fetch
    ///
    /// Used for components packaged during the current run: their bytes are
    /// already on this host, so later fetches of the key are satisfied from
    /// the cache. Overwrites any cached outcome for the key.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cache directory or payload cannot be
    /// written.
    pub async fn publish_local(
        &self,
        name: &str,
        version: &Version,
        bytes: &[u8],
    ) -> Result<VendorEntry, Error> {
        let key = VendorKey {
            name: name.to_string(),
            version: version.clone(),
        };
        let dir = self.root.join(key.dir_name());
        let payload = dir.join("payload");
        let hash = blake3::hash(bytes).to_hex().to_string();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &dir))?;
        tokio::fs::write(&payload, bytes)
            .await
            .map_err(|e| Error::io_with_path(&e, &payload))?;

        let entry = VendorEntry { path: dir, hash };
        self.inflight
            .insert(key, Arc::new(OnceCell::new_with(Some(Ok(entry.clone())))));
        Ok(entry)
    }

    /// Fetch one key into the cache, deduplicating concurrent requests
    async fn get_or_fetch(&self, key: &VendorKey, expected_hash: &str) -> Result<VendorEntry, Error> {
        let cell = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_init(|| self.fetch_into_cache(key, expected_hash))
            .await;
        result.clone().map_err(Error::from)
    }

    /// Single attempt to place a key's content in the cache
    async fn fetch_into_cache(
        &self,
        key: &VendorKey,
        expected_hash: &str,
    ) -> Result<VendorEntry, StoreError> {
        let dir = self.root.join(key.dir_name());
        let payload = dir.join("payload");

        // Append-only reuse: content already on disk with the pinned hash
        // satisfies the fetch without any network access.
        if let Ok(existing) = tokio::fs::read(&payload).await {
            let hash = blake3::hash(&existing).to_hex().to_string();
            if hash == expected_hash {
                return Ok(VendorEntry { path: dir, hash });
            }
        }

        let bytes = self
            .fetcher
            .fetch(&key.name, &key.version)
            .await
            .map_err(|e| StoreError::FetchFailed {
                name: key.name.clone(),
                version: key.version.to_string(),
                cause: e.to_string(),
            })?;

        let hash = blake3::hash(&bytes).to_hex().to_string();
        if hash != expected_hash {
            return Err(StoreError::HashMismatch {
                name: key.name.clone(),
                version: key.version.to_string(),
                expected: expected_hash.to_string(),
                actual: hash,
            });
        }

        let write = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&payload, &bytes).await
        };
        write.await.map_err(|e| StoreError::FetchFailed {
            name: key.name.clone(),
            version: key.version.to_string(),
            cause: e.to_string(),
        })?;

        Ok(VendorEntry { path: dir, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    struct CountingFetcher {
        calls: AtomicUsize,
        payload: Vec<u8>,
        fail: bool,
    }

    impl CountingFetcher {
        fn new(payload: &[u8]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload: payload.to_vec(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                payload: Vec::new(),
                fail: true,
            }
        }
    }

    impl Fetcher for CountingFetcher {
        fn fetch<'a>(
            &'a self,
            name: &'a str,
            version: &'a Version,
        ) -> BoxFuture<'a, Result<Vec<u8>, Error>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                // Give concurrent requesters time to pile onto the cell
                sleep(Duration::from_millis(20)).await;
                if self.fail {
                    Err(Error::internal(format!(
                        "network unreachable fetching {name}-{version}"
                    )))
                } else {
                    Ok(self.payload.clone())
                }
            })
        }
    }

    fn lock_with(name: &str, version: Version, hash: &str) -> VendorLock {
        let mut lock = VendorLock::new("xterm");
        lock.pin(name, version, hash);
        lock
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_fetches_of_one_key_deduplicate() {
        let payload = b"libx11 source".to_vec();
        let hash = blake3::hash(&payload).to_hex().to_string();
        let temp = tempfile::tempdir().unwrap();

        let fetcher = Arc::new(CountingFetcher::new(&payload));
        let store = Arc::new(VendorStore::new(temp.path(), fetcher.clone()));
        let lock = Arc::new(lock_with("libx11", Version::new(1, 8, 0), &hash));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let lock = lock.clone();
            handles.push(tokio::spawn(async move { store.materialize(&lock).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_surfaced_and_not_retried() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::failing());
        let store = VendorStore::new(temp.path(), fetcher.clone());
        let lock = lock_with("libx11", Version::new(1, 8, 0), "00");

        let first = store.materialize(&lock).await.unwrap_err();
        assert!(matches!(first, Error::Store(StoreError::FetchFailed { .. })));

        // A second request within the run gets the cached failure
        let second = store.materialize(&lock).await.unwrap_err();
        assert!(matches!(second, Error::Store(StoreError::FetchFailed { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hash_mismatch_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new(b"tampered"));
        let store = VendorStore::new(temp.path(), fetcher);
        let lock = lock_with("libx11", Version::new(1, 8, 0), &"ab".repeat(32));

        let err = store.materialize(&lock).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::HashMismatch { .. })));
    }

    #[tokio::test]
    async fn locally_published_content_needs_no_fetch() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::failing());
        let store = VendorStore::new(temp.path(), fetcher.clone());

        let entry = store
            .publish_local("xterm", &Version::new(1, 0, 0), b"packaged artifact")
            .await
            .unwrap();

        let lock = lock_with("xterm", Version::new(1, 0, 0), &entry.hash);
        let vendored = store.materialize(&lock).await.unwrap();
        assert_eq!(vendored.entries["xterm"].hash, entry.hash);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn on_disk_content_satisfies_offline_rebuild() {
        let payload = b"cached dependency".to_vec();
        let hash = blake3::hash(&payload).to_hex().to_string();
        let temp = tempfile::tempdir().unwrap();

        // Pre-populate the cache as a previous run would have
        let dir = temp.path().join("libx11-1.8.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("payload"), &payload).unwrap();

        let fetcher = Arc::new(CountingFetcher::failing());
        let store = VendorStore::new(temp.path(), fetcher.clone());
        let lock = lock_with("libx11", Version::new(1, 8, 0), &hash);

        let vendored = store.materialize(&lock).await.unwrap();
        assert_eq!(vendored.entries["libx11"].hash, hash);
        // The failing fetcher was never consulted
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
