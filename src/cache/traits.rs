//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Trait for typed cache keys.
///
/// Each query the application caches gets its own key variant, so the
/// storage key is derived in one place instead of by ad-hoc formatting.
pub trait QueryKey {
  /// Key under which the entry is written to the store.
  fn storage_key(&self) -> String;

  /// Human readable description for logs.
  fn description(&self) -> String;
}

/// A cached payload together with its write time.
///
/// Serialized as `{"data": ..., "timestamp": <ms since epoch>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry<T> {
  pub data: T,
  /// Write time in milliseconds since the Unix epoch
  pub timestamp: i64,
}

impl<T> CachedEntry<T> {
  /// Create an entry stamped with the current time.
  pub fn new(data: T) -> Self {
    Self {
      data,
      timestamp: Utc::now().timestamp_millis(),
    }
  }

  /// An entry is fresh while `now - timestamp < ttl`. An age that does not
  /// fit in an `i64` is never fresh.
  pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
    now_ms
      .checked_sub(self.timestamp)
      .is_some_and(|age| age < ttl.num_milliseconds())
  }

  pub fn cached_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.timestamp)
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a fresh cache entry.
  pub fn from_cache(entry: CachedEntry<T>) -> Self {
    let cached_at = entry.cached_at();
    Self {
      data: entry.data,
      source: CacheSource::Cache,
      cached_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the remote API on this call
  Network,
  /// Served from a fresh cache entry
  Cache,
}
