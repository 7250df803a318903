//! Catalog client with transparent caching.

use serde_json::Value;
use tracing::trace;

use crate::cache::CacheLayer;
use crate::storage::KeyValueStore;

use super::cache::ShopQueryKey;
use super::client::ProductApi;
use super::error::FetchError;
use super::types::{Product, ProductId};

/// Catalog client that answers from a fresh cache entry when it can and
/// from the API otherwise.
///
/// The `fetch_*` methods return the JSON exactly as the API shaped it; the
/// typed helpers decode it into [`Product`]s and category names.
pub struct CachedShopClient<A, S: KeyValueStore + ?Sized> {
  inner: A,
  cache: CacheLayer<S>,
}

impl<A: ProductApi, S: KeyValueStore + ?Sized> CachedShopClient<A, S> {
  pub fn new(inner: A, cache: CacheLayer<S>) -> Self {
    Self { inner, cache }
  }

  /// All products.
  pub async fn fetch_products(&self) -> Result<Value, FetchError> {
    self.fetch(ShopQueryKey::AllProducts).await
  }

  /// A single product by id.
  pub async fn fetch_product_by_id(&self, id: &ProductId) -> Result<Value, FetchError> {
    self.fetch(ShopQueryKey::Product { id: id.clone() }).await
  }

  /// All category names.
  pub async fn fetch_categories(&self) -> Result<Value, FetchError> {
    self.fetch(ShopQueryKey::Categories).await
  }

  pub async fn products(&self) -> Result<Vec<Product>, FetchError> {
    Ok(serde_json::from_value(self.fetch_products().await?)?)
  }

  pub async fn product(&self, id: &ProductId) -> Result<Product, FetchError> {
    Ok(serde_json::from_value(self.fetch_product_by_id(id).await?)?)
  }

  pub async fn categories(&self) -> Result<Vec<String>, FetchError> {
    Ok(serde_json::from_value(self.fetch_categories().await?)?)
  }

  /// Products of one category, filtered locally from the cached listing.
  pub async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, FetchError> {
    let products = self.products().await?;
    Ok(
      products
        .into_iter()
        .filter(|p| p.category.as_deref() == Some(category))
        .collect(),
    )
  }

  async fn fetch(&self, key: ShopQueryKey) -> Result<Value, FetchError> {
    let result = self
      .cache
      .fetch(&key, || self.inner.get_json(key.path_segments()))
      .await?;
    trace!(source = ?result.source, cached_at = ?result.cached_at, "Resolved {:?}", key);

    Ok(result.data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CachedEntry, DEFAULT_TTL_MS};
  use crate::storage::MemoryStore;
  use chrono::Utc;
  use serde_json::json;
  use std::collections::HashMap;
  use std::future::Future;
  use std::sync::{Arc, Mutex};

  /// In-process API that records every request.
  #[derive(Default)]
  struct FakeApi {
    responses: HashMap<String, Result<Value, u16>>,
    requests: Mutex<Vec<String>>,
  }

  impl FakeApi {
    fn with(mut self, path: &str, response: Result<Value, u16>) -> Self {
      self.responses.insert(path.to_string(), response);
      self
    }

    fn requests(&self) -> Vec<String> {
      self.requests.lock().unwrap().clone()
    }
  }

  impl ProductApi for &FakeApi {
    fn get_json(
      &self,
      segments: Vec<String>,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send {
      let path = format!("/{}", segments.join("/"));
      self.requests.lock().unwrap().push(path.clone());
      let response = match self.responses.get(&path) {
        Some(Ok(value)) => Ok(value.clone()),
        Some(Err(status)) => Err(FetchError::Status { status: *status }),
        None => Err(FetchError::Status { status: 404 }),
      };
      async move { response }
    }
  }

  fn client<'a>(
    api: &'a FakeApi,
    store: &Arc<MemoryStore>,
  ) -> CachedShopClient<&'a FakeApi, MemoryStore> {
    CachedShopClient::new(api, CacheLayer::new(Arc::clone(store)))
  }

  fn sample_products() -> Value {
    json!([
      {"id": 1, "title": "Backpack", "price": 109.95, "category": "men's clothing"},
      {"id": 5, "title": "Bracelet", "price": 695, "category": "jewelery"},
      {"id": 6, "title": "Ring", "price": 10.99, "category": "jewelery"}
    ])
  }

  #[tokio::test]
  async fn test_product_by_id_cached_under_product_key() {
    let product = json!({"id": 5, "title": "Bracelet", "price": 10.99});
    let api = FakeApi::default().with("/products/5", Ok(product.clone()));
    let store = Arc::new(MemoryStore::new());
    let shop = client(&api, &store);

    let first = shop.fetch_product_by_id(&5.into()).await.unwrap();
    assert_eq!(first, product);
    assert_eq!(api.requests(), vec!["/products/5"]);

    let entry: CachedEntry<Value> =
      serde_json::from_str(&store.get("product_5").unwrap().unwrap()).unwrap();
    assert_eq!(entry.data, product);
    assert!(Utc::now().timestamp_millis() - entry.timestamp < 60_000);

    let second = shop.fetch_product_by_id(&5.into()).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(api.requests().len(), 1);
  }

  #[tokio::test]
  async fn test_each_query_uses_its_endpoint_and_key() {
    let api = FakeApi::default()
      .with("/products", Ok(sample_products()))
      .with("/products/categories", Ok(json!(["jewelery", "men's clothing"])));
    let store = Arc::new(MemoryStore::new());
    let shop = client(&api, &store);

    shop.fetch_products().await.unwrap();
    shop.fetch_categories().await.unwrap();

    assert_eq!(api.requests(), vec!["/products", "/products/categories"]);
    assert!(store.get("allProducts").unwrap().is_some());
    assert!(store.get("productCategories").unwrap().is_some());
  }

  #[tokio::test]
  async fn test_status_error_is_not_cached() {
    let api = FakeApi::default().with("/products", Err(500));
    let store = Arc::new(MemoryStore::new());
    let shop = client(&api, &store);

    let err = shop.fetch_products().await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500 }));
    assert_eq!(store.get("allProducts").unwrap(), None);

    // Nothing cached, so the next call goes to the API again
    shop.fetch_products().await.unwrap_err();
    assert_eq!(api.requests().len(), 2);
  }

  #[tokio::test]
  async fn test_expired_entry_refetches() {
    let api = FakeApi::default().with("/products/categories", Ok(json!(["new"])));
    let store = Arc::new(MemoryStore::new());
    let stale = CachedEntry {
      data: json!(["old"]),
      timestamp: Utc::now().timestamp_millis() - DEFAULT_TTL_MS,
    };
    store
      .set("productCategories", &serde_json::to_string(&stale).unwrap())
      .unwrap();
    let shop = client(&api, &store);

    assert_eq!(shop.categories().await.unwrap(), vec!["new"]);
    assert_eq!(api.requests().len(), 1);
  }

  #[tokio::test]
  async fn test_typed_helpers() {
    let api = FakeApi::default().with("/products", Ok(sample_products()));
    let store = Arc::new(MemoryStore::new());
    let shop = client(&api, &store);

    let products = shop.products().await.unwrap();
    assert_eq!(products.len(), 3);
    assert_eq!(products[1].price, 695.0);

    let jewelery = shop.products_in_category("jewelery").await.unwrap();
    let ids: Vec<_> = jewelery.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec![ProductId::from(5), ProductId::from(6)]);

    // Category filtering is served from the cached listing
    assert_eq!(api.requests().len(), 1);
  }

  #[tokio::test]
  async fn test_unexpected_shape_is_parse_error() {
    let api = FakeApi::default().with("/products/7", Ok(json!({"id": 7})));
    let store = Arc::new(MemoryStore::new());
    let shop = client(&api, &store);

    let err = shop.product(&7.into()).await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
  }
}
