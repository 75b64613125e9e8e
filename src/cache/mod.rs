//! Content-addressed cache for external query results.
//!
//! Every expensive external call is keyed by a deterministic fingerprint of
//! its canonicalized request and stored one-entry-per-file under the store
//! directory. Entries never expire; invalidation is the caller's explicit
//! responsibility via [`CacheStore::clear`].
//!
//! Corrupt entries (truncated bytes, unparseable JSON, unknown envelope
//! version) are recovered locally: the file is deleted and the value is
//! recomputed. Writes go through a temp file and rename so readers never
//! observe a partial entry. Concurrent use from independent processes is
//! unsupported; simultaneous writers race with last-writer-wins per entry.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

/// On-disk entry envelope version
const ENTRY_SCHEMA_VERSION: u32 = 1;

/// Deterministic fingerprint of a canonicalized request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an ordered sequence of role-tagged content parts.
    ///
    /// Canonicalization is order-sensitive and whitespace-exact: each part
    /// renders as `role: content` and parts are joined with a newline, so
    /// logically distinct requests never collide and identical requests
    /// always produce the same key, across process restarts.
    pub fn of_request<'a>(parts: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let canonical: Vec<String> = parts
            .into_iter()
            .map(|(role, content)| format!("{role}: {content}"))
            .collect();
        Self::of_text(&canonical.join("\n"))
    }

    /// Fingerprint raw text
    pub fn of_text(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Self-describing wrapper written to disk, so entries remain readable
/// (or cleanly discardable) across layout changes.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    schema_version: u32,
    value: serde_json::Value,
}

/// File-backed cache handle, always constructed with an explicit directory
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) a cache store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint.as_str()))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(".lock")
    }

    /// Load an entry, recovering locally from corruption.
    ///
    /// Returns `Ok(None)` both when the entry is absent and when it was
    /// corrupt (in which case it has been deleted so the caller recomputes).
    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<serde_json::Value>> {
        let path = self.entry_path(fingerprint);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read cache entry: {}", path.display()))
            }
        };

        match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) if envelope.schema_version == ENTRY_SCHEMA_VERSION => {
                debug!(%fingerprint, "cache hit");
                Ok(Some(envelope.value))
            }
            Ok(envelope) => {
                warn!(
                    %fingerprint,
                    version = envelope.schema_version,
                    "cache entry has unknown schema version, discarding"
                );
                fs::remove_file(&path).await.ok();
                Ok(None)
            }
            Err(e) => {
                warn!(%fingerprint, error = %e, "cache entry is corrupt, discarding");
                fs::remove_file(&path).await.ok();
                Ok(None)
            }
        }
    }

    /// Persist an entry atomically: write to a temp file in the same
    /// directory, then rename over the final path under an exclusive lock.
    pub async fn put(&self, fingerprint: &Fingerprint, value: &serde_json::Value) -> Result<()> {
        let path = self.entry_path(fingerprint);
        let envelope = Envelope {
            schema_version: ENTRY_SCHEMA_VERSION,
            value: value.clone(),
        };
        let json = serde_json::to_vec(&envelope).context("Failed to serialize cache entry")?;

        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(self.lock_path())
            .with_context(|| format!("Failed to open cache lock file in {}", self.dir.display()))?;
        lock_file
            .lock_exclusive()
            .context("Failed to acquire cache write lock")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary cache file")?;
        tmp.write_all(&json)
            .context("Failed to write cache entry")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist cache entry: {}", path.display()))?;

        // Lock is released when lock_file is dropped.
        debug!(%fingerprint, "cache entry written");
        Ok(())
    }

    /// Return the cached value for `fingerprint`, or run `compute`, persist
    /// its result, and return it.
    ///
    /// `compute` runs at most once per fingerprint for a populated store; a
    /// corrupt entry is deleted and recomputed rather than surfaced. Errors
    /// from `compute` propagate unchanged and nothing is persisted.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<serde_json::Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value>>,
    {
        if let Some(value) = self.get(fingerprint).await? {
            return Ok(value);
        }

        debug!(%fingerprint, "cache miss, computing");
        let value = compute().await?;
        self.put(fingerprint, &value).await?;
        Ok(value)
    }

    /// Delete every entry. Returns the number of entries removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0usize;
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read cache directory: {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .await
                    .with_context(|| format!("Failed to remove cache entry: {}", path.display()))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Number of entries currently stored
    pub async fn entry_count(&self) -> Result<usize> {
        let mut count = 0usize;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}
