//! Catalog access: the HTTP client, its cache keys and the cached facade.

mod cache;
mod cached_client;
mod client;
mod error;
mod types;

pub use cached_client::CachedShopClient;
pub use client::{FakeStoreClient, ProductApi};
pub use error::FetchError;
pub use types::{Product, ProductId};
