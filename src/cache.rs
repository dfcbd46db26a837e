//! Content-addressed cache of query results
//!
//! Each entry lives in `<cache_dir>/<sha256(normalized query)>.json`. Failures
//! never escape this module: a broken read is a miss and a broken write is
//! dropped after logging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Table;

/// Bumped whenever the serialized row shape changes
const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache entry has format version {0}")]
    VersionMismatch(u32),
    #[error("Cache entry expired (age {0:?})")]
    Expired(Duration),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    version: u32,
    created_at: DateTime<Utc>,
    rows: Table,
}

/// File-backed query result cache
#[derive(Debug, Clone)]
pub struct QueryCache {
    cache_dir: PathBuf,
    ttl: Option<Duration>,
}

impl QueryCache {
    /// Open a cache rooted at `cache_dir`, creating the directory if possible
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!("Could not create cache directory {}: {}", cache_dir.display(), e);
        }

        Self {
            cache_dir,
            ttl: None,
        }
    }

    /// Treat entries older than `ttl` as misses. `None` keeps entries forever.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// SHA-256 hex digest of the query with whitespace runs collapsed
    pub fn key_for(query: &str) -> String {
        let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
        hex::encode(Sha256::digest(normalized.as_bytes()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Look up a previously stored result
    pub fn get(&self, query: &str) -> Option<Table> {
        let path = self.entry_path(&Self::key_for(query));
        if !path.exists() {
            debug!("Cache miss: {}", path.display());
            return None;
        }

        match self.read_entry(&path) {
            Ok(rows) => {
                debug!("Loading data from cache: {}", path.display());
                Some(rows)
            }
            Err(e) => {
                warn!("Error loading cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a result. Empty tables are never stored so a failed fetch can be retried.
    pub fn put(&self, query: &str, table: &Table) {
        if table.is_empty() {
            return;
        }

        let path = self.entry_path(&Self::key_for(query));
        match self.write_entry(&path, table) {
            Ok(()) => debug!("Saved data to cache: {}", path.display()),
            Err(e) => warn!("Error saving cache entry {}: {}", path.display(), e),
        }
    }

    fn read_entry(&self, path: &Path) -> Result<Table, CacheError> {
        let contents = fs::read_to_string(path)?;
        let envelope: CacheEnvelope = serde_json::from_str(&contents)?;

        if envelope.version != CACHE_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch(envelope.version));
        }

        if let Some(ttl) = self.ttl {
            // A created_at in the future yields Err here and counts as fresh
            if let Ok(age) = (Utc::now() - envelope.created_at).to_std() {
                if age > ttl {
                    return Err(CacheError::Expired(age));
                }
            }
        }

        Ok(envelope.rows)
    }

    fn write_entry(&self, path: &Path, table: &Table) -> Result<(), CacheError> {
        let envelope = CacheEnvelope {
            version: CACHE_FORMAT_VERSION,
            created_at: Utc::now(),
            rows: table.clone(),
        };
        let contents = serde_json::to_string(&envelope)?;

        // Write beside the target then rename so readers never see half an entry
        let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&tmp_path, contents)?;
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(())
    }
}
