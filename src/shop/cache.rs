//! Cache keys for catalog queries.

use crate::cache::QueryKey;

use super::types::ProductId;

/// Query key types for catalog API calls.
///
/// Each variant knows both its storage key and the API path it is served from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShopQueryKey {
  /// All products
  AllProducts,
  /// A single product by id
  Product { id: ProductId },
  /// All category names
  Categories,
}

impl ShopQueryKey {
  /// Path segments below the API base URL.
  pub fn path_segments(&self) -> Vec<String> {
    match self {
      Self::AllProducts => vec!["products".to_string()],
      Self::Product { id } => vec!["products".to_string(), id.to_string()],
      Self::Categories => vec!["products".to_string(), "categories".to_string()],
    }
  }
}

impl QueryKey for ShopQueryKey {
  fn storage_key(&self) -> String {
    match self {
      Self::AllProducts => "allProducts".to_string(),
      Self::Product { id } => format!("product_{}", id.key_fragment()),
      Self::Categories => "productCategories".to_string(),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::AllProducts => "products".to_string(),
      Self::Product { id } => format!("product {}", id),
      Self::Categories => "categories".to_string(),
    }
  }
}
