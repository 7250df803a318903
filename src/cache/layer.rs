//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::traits::{CacheResult, CachedEntry, QueryKey};
use crate::storage::KeyValueStore;

/// Default time-to-live of a cache entry.
pub const DEFAULT_TTL_MS: i64 = 60 * 60 * 1000;

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Cache layer that manages caching logic and network fetching.
///
/// Entries live in a [`KeyValueStore`] as JSON `{data, timestamp}` records.
/// An entry younger than the TTL is returned without calling the fetcher;
/// anything else (missing, expired, unreadable) is a miss.
pub struct CacheLayer<S: KeyValueStore + ?Sized> {
  storage: Arc<S>,
  ttl: Duration,
  /// Per-key gates so concurrent misses on one key share a single fetch
  in_flight: Arc<Mutex<HashMap<String, Gate>>>,
}

impl<S: KeyValueStore + ?Sized> CacheLayer<S> {
  /// Create a new cache layer over a shared storage backend.
  pub fn new(storage: Arc<S>) -> Self {
    Self {
      storage,
      ttl: Duration::milliseconds(DEFAULT_TTL_MS),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Set the time-to-live for cached data.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. If stale/missing, call the fetcher
  /// 3. On fetcher error, return it and leave the cache untouched
  /// 4. On success, overwrite the entry with a freshly stamped one
  pub async fn fetch<T, K, F, Fut, E>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    K: QueryKey + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let storage_key = key.storage_key();

    if let Some(entry) = self.lookup::<T>(&storage_key) {
      debug!(key = %storage_key, "Serving {} from cache", key.description());
      return Ok(CacheResult::from_cache(entry));
    }

    let gate = self.acquire_gate(&storage_key);
    let result = {
      let _guard = gate.lock().await;

      // Another caller may have filled the entry while we waited on the gate
      if let Some(entry) = self.lookup::<T>(&storage_key) {
        debug!(key = %storage_key, "Serving {} from cache", key.description());
        Ok(CacheResult::from_cache(entry))
      } else {
        info!(key = %storage_key, "Fetching {} from API", key.description());
        match fetcher().await {
          Ok(data) => {
            self.store(&storage_key, &data);
            Ok(CacheResult::from_network(data))
          }
          Err(e) => Err(e),
        }
      }
    };
    self.release_gate(&storage_key, gate);

    result
  }

  /// Look up a fresh entry. Unreadable or expired entries count as absent.
  fn lookup<T: DeserializeOwned>(&self, storage_key: &str) -> Option<CachedEntry<T>> {
    let raw = match self.storage.get(storage_key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(key = %storage_key, "Cache read failed, treating as miss: {}", e);
        return None;
      }
    };

    let entry: CachedEntry<T> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        debug!(key = %storage_key, "Ignoring malformed cache entry: {}", e);
        return None;
      }
    };

    if entry.is_fresh(Utc::now().timestamp_millis(), self.ttl) {
      Some(entry)
    } else {
      debug!(key = %storage_key, "Cache entry expired");
      None
    }
  }

  /// Write a fresh entry. A failed write does not fail the fetch.
  fn store<T: Serialize>(&self, storage_key: &str, data: &T) {
    let encoded = match serde_json::to_string(&CachedEntry::new(data)) {
      Ok(encoded) => encoded,
      Err(e) => {
        warn!(key = %storage_key, "Failed to encode cache entry: {}", e);
        return;
      }
    };

    if let Err(e) = self.storage.set(storage_key, &encoded) {
      warn!(key = %storage_key, "Failed to write cache entry: {}", e);
    }
  }

  fn acquire_gate(&self, storage_key: &str) -> Gate {
    let mut in_flight = self
      .in_flight
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(in_flight.entry(storage_key.to_string()).or_default())
  }

  fn release_gate(&self, storage_key: &str, gate: Gate) {
    let mut in_flight = self
      .in_flight
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    // Only the map and this caller hold it: nobody else is waiting
    if Arc::strong_count(&gate) == 2 {
      in_flight.remove(storage_key);
    }
  }
}

impl<S: KeyValueStore + ?Sized> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      ttl: self.ttl,
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}
