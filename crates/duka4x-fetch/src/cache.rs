//! On-disk hour cache: one entry per `(instrument, hour)`, gated by three
//! mutually exclusive sentinel files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::client::{FetchClient, FetchError};
use crate::url::{cache_path, tick_url};

/// Errors that can occur while ensuring an hour is cached.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The underlying fetch failed after exhausting its retries.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// A filesystem operation (sentinel creation, rename) failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an [`HourCache::ensure`] call found or produced for one hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// `<path>` exists and holds compressed tick data.
    HasData,
    /// `<path>.empty` exists: the vendor served an empty body for this hour.
    Empty,
    /// `<path>.notFound` exists: the vendor returned 404 for this hour.
    NotFound,
}

/// Manages the on-disk hour cache under a root directory.
#[derive(Debug, Clone)]
pub struct HourCache {
    root: PathBuf,
    client: FetchClient,
}

impl HourCache {
    /// Creates a cache rooted at `root`, using its own [`FetchClient`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            root: root.into(),
            client: FetchClient::new()?,
        })
    }

    /// The on-disk path (without sentinel suffix) for this instrument+hour.
    #[must_use]
    pub fn path(&self, code: &str, hour_utc: DateTime<Utc>) -> PathBuf {
        cache_path(&self.root, code, hour_utc)
    }

    /// Ensures the given hour is present in the cache, downloading it if
    /// necessary.
    ///
    /// Idempotent: if any of the three sentinels already exists, this
    /// returns immediately without touching the network. Safe to call
    /// concurrently for the same hour key — the final rename is atomic and
    /// sentinel creation is a no-op if the target already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch exhausts its retries or a filesystem
    /// operation fails.
    pub async fn ensure(&self, code: &str, hour_utc: DateTime<Utc>) -> Result<CacheState, CacheError> {
        let dest = self.path(code, hour_utc);
        if let Some(state) = Self::existing_state(&dest) {
            return Ok(state);
        }

        let url = tick_url(code, hour_utc);
        let outcome = self.client.fetch(&url, &dest).await?;

        if outcome.not_found() {
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let marker = Self::not_found_marker(&dest);
            tokio::fs::File::create(&marker).await?;
            return Ok(CacheState::NotFound);
        }

        if outcome.bytes_written == 0 {
            let marker = Self::empty_marker(&dest);
            // `fetch` may have already created an empty file at `dest`; move
            // it aside under the `.empty` sentinel name.
            if tokio::fs::metadata(&dest).await.is_ok() {
                tokio::fs::rename(&dest, &marker).await?;
            } else {
                tokio::fs::File::create(&marker).await?;
            }
            return Ok(CacheState::Empty);
        }

        Ok(CacheState::HasData)
    }

    /// Returns the sentinel state already on disk for `dest`, if any.
    fn existing_state(dest: &Path) -> Option<CacheState> {
        if dest.exists() {
            Some(CacheState::HasData)
        } else if Self::empty_marker(dest).exists() {
            Some(CacheState::Empty)
        } else if Self::not_found_marker(dest).exists() {
            Some(CacheState::NotFound)
        } else {
            None
        }
    }

    fn empty_marker(dest: &Path) -> PathBuf {
        Self::with_extra_suffix(dest, ".empty")
    }

    fn not_found_marker(dest: &Path) -> PathBuf {
        Self::with_extra_suffix(dest, ".notFound")
    }

    fn with_extra_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut os = path.as_os_str().to_os_string();
        os.push(suffix);
        PathBuf::from(os)
    }
}
