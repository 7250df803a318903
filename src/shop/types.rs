use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Product identifier as the API hands it out.
///
/// The catalog uses integers, but string ids are accepted verbatim so a
/// record never fails to load because of its id type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
  Number(u64),
  Text(String),
}

impl ProductId {
  /// Fragment used in cache keys. Text ids are JSON-quoted so `5` and `"5"`
  /// map to different keys.
  pub fn key_fragment(&self) -> String {
    match self {
      Self::Number(n) => n.to_string(),
      Self::Text(s) => Value::String(s.clone()).to_string(),
    }
  }
}

impl fmt::Display for ProductId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Number(n) => f.pad(&n.to_string()),
      Self::Text(s) => f.pad(s),
    }
  }
}

impl FromStr for ProductId {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s.parse::<u64>() {
      Ok(n) => Self::Number(n),
      Err(_) => Self::Text(s.to_string()),
    })
  }
}

impl From<u64> for ProductId {
  fn from(n: u64) -> Self {
    Self::Number(n)
  }
}

impl From<&str> for ProductId {
  fn from(s: &str) -> Self {
    Self::Text(s.to_string())
  }
}

/// Catalog product.
///
/// Only `id` and `price` are interpreted; every other field the API sends
/// is kept so a product stored in the cart round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: ProductId,
  #[serde(default)]
  pub title: String,
  pub price: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Product {
  #[cfg(test)]
  pub fn new(id: impl Into<ProductId>, title: &str, price: f64) -> Self {
    Self {
      id: id.into(),
      title: title.to_string(),
      price,
      category: None,
      description: None,
      image: None,
      extra: Map::new(),
    }
  }
}
