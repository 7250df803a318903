//! In-memory cart with derived totals and change listeners.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::shop::{Product, ProductId};
use crate::storage::KeyValueStore;

/// Storage key the cart is mirrored under.
pub const CART_STORAGE_KEY: &str = "cartItems";

/// One product and how many of it are in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
  pub product: Product,
  pub quantity: u32,
}

impl CartLine {
  pub fn subtotal(&self) -> f64 {
    self.product.price * f64::from(self.quantity)
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
  #[error("Quantity must be at least 1")]
  InvalidQuantity,
}

type Listener = Box<dyn Fn(&[CartLine]) + Send + Sync>;

/// Cart state container.
///
/// Lines keep the order in which products were first added and there is
/// at most one line per product id. Every call that changes the lines
/// notifies each listener exactly once with the full line list.
#[derive(Default)]
pub struct CartStore {
  items: Vec<CartLine>,
  listeners: Vec<Listener>,
}

impl CartStore {
  #[cfg(test)]
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from previously persisted lines.
  ///
  /// A missing or unreadable value yields an empty cart. Lines with a
  /// zero quantity are dropped.
  pub fn from_store<S: KeyValueStore + ?Sized>(store: &S) -> Self {
    let mut items: Vec<CartLine> = match store.get(CART_STORAGE_KEY) {
      Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Ignoring unreadable persisted cart: {}", e);
        Vec::new()
      }),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!("Failed to read persisted cart: {}", e);
        Vec::new()
      }
    };

    let loaded = items.len();
    items.retain(|line| line.quantity > 0);
    if items.len() != loaded {
      warn!(dropped = loaded - items.len(), "Dropped persisted cart lines without quantity");
    }
    debug!(lines = items.len(), "Loaded cart");

    Self {
      items,
      listeners: Vec::new(),
    }
  }

  /// Register a listener called after every change.
  pub fn subscribe<F>(&mut self, listener: F)
  where
    F: Fn(&[CartLine]) + Send + Sync + 'static,
  {
    self.listeners.push(Box::new(listener));
  }

  /// Add `quantity` of `product`, merging into an existing line for the same id.
  pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<(), CartError> {
    if quantity == 0 {
      return Err(CartError::InvalidQuantity);
    }

    match self.position(&product.id) {
      Some(index) => {
        let line = &mut self.items[index];
        line.quantity = line.quantity.saturating_add(quantity);
      }
      None => self.items.push(CartLine { product, quantity }),
    }

    self.notify();
    Ok(())
  }

  /// Drop the line for `id`. Returns whether a line was removed.
  pub fn remove_item(&mut self, id: &ProductId) -> bool {
    match self.position(id) {
      Some(index) => {
        self.items.remove(index);
        self.notify();
        true
      }
      None => false,
    }
  }

  /// Set the quantity of an existing line; zero or below removes it.
  ///
  /// Returns whether the cart held the product.
  pub fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> bool {
    let Some(index) = self.position(id) else {
      return false;
    };

    if quantity > 0 {
      self.items[index].quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
    } else {
      self.items.remove(index);
    }

    self.notify();
    true
  }

  pub fn clear_cart(&mut self) {
    self.items.clear();
    self.notify();
  }

  pub fn cart_items(&self) -> &[CartLine] {
    &self.items
  }

  /// Sum of `quantity * price` over all lines, with two decimals.
  pub fn cart_total(&self) -> String {
    let total = self
      .items
      .iter()
      .fold(0.0_f64, |acc, line| acc + line.subtotal());
    format_amount(total)
  }

  pub fn item_count(&self) -> u64 {
    self.items.iter().map(|line| u64::from(line.quantity)).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  fn position(&self, id: &ProductId) -> Option<usize> {
    self.items.iter().position(|line| &line.product.id == id)
  }

  fn notify(&self) {
    for listener in &self.listeners {
      listener(&self.items);
    }
  }
}

/// Two-decimal rendering where exact halfway values round away from zero.
///
/// `{:.2}` already rounds the exact binary value correctly except on ties,
/// which it sends to even (`0.125` would print as `0.12`).
fn format_amount(value: f64) -> String {
  let scaled = value * 100.0;
  // A tie needs value to be a multiple of 1/8, which also makes the scaling exact
  if (value * 8.0).fract() == 0.0 && scaled.fract().abs() == 0.5 {
    return format!("{:.2}", scaled.round() / 100.0);
  }
  format!("{:.2}", value)
}

impl std::fmt::Debug for CartStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartStore")
      .field("items", &self.items)
      .field("listeners", &self.listeners.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryStore;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  fn product(id: u64, price: f64) -> Product {
    Product::new(id, &format!("product {}", id), price)
  }

  fn counting_cart() -> (CartStore, Arc<AtomicUsize>) {
    let mut cart = CartStore::new();
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    cart.subscribe(move |_| {
      seen.fetch_add(1, Ordering::SeqCst);
    });
    (cart, count)
  }

  #[test]
  fn test_single_addition_total() {
    let cases = [
      (10.99, 1, "10.99"),
      (10.99, 3, "32.97"),
      (0.1, 3, "0.30"),
      (695.0, 2, "1390.00"),
    ];
    for (price, quantity, expected) in cases {
      let mut cart = CartStore::new();
      cart.add_item(product(1, price), quantity).unwrap();
      assert_eq!(cart.cart_total(), expected);
    }
  }

  #[test]
  fn test_empty_cart_total_is_unsigned_zero() {
    assert_eq!(CartStore::new().cart_total(), "0.00");
  }

  #[test]
  fn test_halfway_totals_round_up() {
    let cases = [
      (0.125, 1, "0.13"),
      (0.625, 1, "0.63"),
      (0.375, 3, "1.13"),
      (2.675, 1, "2.67"),
      (1.005, 1, "1.00"),
    ];
    for (price, quantity, expected) in cases {
      let mut cart = CartStore::new();
      cart.add_item(product(1, price), quantity).unwrap();
      assert_eq!(cart.cart_total(), expected, "price {} x {}", price, quantity);
    }
  }

  #[test]
  fn test_repeated_additions_merge() {
    let mut cart = CartStore::new();
    cart.add_item(product(1, 2.5), 2).unwrap();
    cart.add_item(product(1, 2.5), 3).unwrap();

    assert_eq!(cart.cart_items().len(), 1);
    assert_eq!(cart.cart_items()[0].quantity, 5);
    assert_eq!(cart.item_count(), 5);
    assert_eq!(cart.cart_total(), "12.50");
  }

  #[test]
  fn test_lines_keep_insertion_order() {
    let mut cart = CartStore::new();
    cart.add_item(product(3, 1.0), 1).unwrap();
    cart.add_item(product(1, 1.0), 1).unwrap();
    cart.add_item(product(3, 1.0), 1).unwrap();

    let ids: Vec<_> = cart.cart_items().iter().map(|l| l.product.id.clone()).collect();
    assert_eq!(ids, vec![ProductId::from(3), ProductId::from(1)]);
  }

  #[test]
  fn test_zero_quantity_add_is_rejected() {
    let (mut cart, notified) = counting_cart();
    assert_eq!(cart.add_item(product(1, 1.0), 0), Err(CartError::InvalidQuantity));
    assert!(cart.is_empty());
    assert_eq!(notified.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn test_quantity_saturates() {
    let mut cart = CartStore::new();
    cart.add_item(product(1, 0.0), u32::MAX).unwrap();
    cart.add_item(product(1, 0.0), 5).unwrap();
    assert_eq!(cart.cart_items()[0].quantity, u32::MAX);
  }

  #[test]
  fn test_update_quantity() {
    let mut cart = CartStore::new();
    cart.add_item(product(1, 4.0), 1).unwrap();

    assert!(cart.update_quantity(&1.into(), 7));
    assert_eq!(cart.item_count(), 7);
    assert_eq!(cart.cart_total(), "28.00");
  }

  #[test]
  fn test_update_to_zero_or_negative_removes() {
    let mut cart = CartStore::new();
    cart.add_item(product(1, 4.0), 1).unwrap();
    cart.add_item(product(2, 4.0), 1).unwrap();

    assert!(cart.update_quantity(&1.into(), 0));
    assert!(cart.update_quantity(&2.into(), -3));
    assert!(cart.is_empty());
  }

  #[test]
  fn test_update_unknown_id_is_noop() {
    let (mut cart, notified) = counting_cart();
    cart.add_item(product(1, 4.0), 2).unwrap();

    assert!(!cart.update_quantity(&9.into(), 3));
    assert_eq!(cart.item_count(), 2);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_remove_item() {
    let mut cart = CartStore::new();
    cart.add_item(product(1, 1.0), 1).unwrap();
    cart.add_item(product(2, 1.0), 1).unwrap();

    assert!(cart.remove_item(&1.into()));
    assert_eq!(cart.cart_items().len(), 1);
    assert_eq!(cart.cart_items()[0].product.id, ProductId::from(2));
  }

  #[test]
  fn test_remove_unknown_id_leaves_cart_unchanged() {
    let (mut cart, notified) = counting_cart();
    cart.add_item(product(1, 1.0), 2).unwrap();
    let before = cart.cart_items().to_vec();

    assert!(!cart.remove_item(&2.into()));
    assert!(!cart.remove_item(&"1".into()));
    assert_eq!(cart.cart_items(), before.as_slice());
    assert_eq!(notified.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_clear_cart() {
    let (mut cart, notified) = counting_cart();
    cart.add_item(product(1, 1.0), 2).unwrap();
    cart.clear_cart();

    assert!(cart.cart_items().is_empty());
    assert_eq!(cart.item_count(), 0);
    assert_eq!(cart.cart_total(), "0.00");
    assert_eq!(notified.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_one_notification_per_change() {
    let (mut cart, notified) = counting_cart();
    cart.add_item(product(1, 1.0), 1).unwrap();
    cart.add_item(product(1, 1.0), 1).unwrap();
    cart.update_quantity(&1.into(), 4);
    cart.update_quantity(&1.into(), 0);
    assert_eq!(notified.load(Ordering::SeqCst), 4);
  }

  #[test]
  fn test_from_store_loads_lines() {
    let store = MemoryStore::new();
    store
      .set(
        CART_STORAGE_KEY,
        r#"[{"product":{"id":5,"title":"Ring","price":10.99},"quantity":2}]"#,
      )
      .unwrap();

    let cart = CartStore::from_store(&store);
    assert_eq!(cart.item_count(), 2);
    assert_eq!(cart.cart_total(), "21.98");
  }

  #[test]
  fn test_from_store_defaults_to_empty() {
    let store = MemoryStore::new();
    assert!(CartStore::from_store(&store).is_empty());

    store.set(CART_STORAGE_KEY, "not json").unwrap();
    assert!(CartStore::from_store(&store).is_empty());

    store.set(CART_STORAGE_KEY, "null").unwrap();
    assert!(CartStore::from_store(&store).is_empty());
  }

  #[test]
  fn test_from_store_drops_zero_quantity_lines() {
    let store = MemoryStore::new();
    store
      .set(
        CART_STORAGE_KEY,
        r#"[{"product":{"id":5,"title":"Ring","price":10.99},"quantity":0},
            {"product":{"id":6,"title":"Bracelet","price":2.5},"quantity":2}]"#,
      )
      .unwrap();

    let cart = CartStore::from_store(&store);
    assert_eq!(cart.cart_items().len(), 1);
    assert_eq!(cart.cart_items()[0].product.id, ProductId::from(6));
    assert_eq!(cart.cart_total(), "5.00");
  }
}
