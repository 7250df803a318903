//! Time-boxed caching layer in front of the remote catalog API.
//!
//! This module provides an API-agnostic caching mechanism that:
//! - Stores each query result as a `{data, timestamp}` record in a key-value store
//! - Serves entries younger than the TTL without touching the network
//! - Treats missing, expired and malformed entries alike as misses
//! - Lets concurrent misses on one key share a single fetch

mod layer;
mod traits;

pub use layer::CacheLayer;
pub use traits::QueryKey;

#[cfg(test)]
pub use layer::DEFAULT_TTL_MS;
#[cfg(test)]
pub use traits::CachedEntry;
