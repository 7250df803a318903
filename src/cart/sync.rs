//! Mirrors the cart into the key-value store.

use std::sync::Arc;
use tracing::warn;

use super::store::{CartLine, CartStore, CART_STORAGE_KEY};
use crate::storage::KeyValueStore;

/// Cart listener that writes the full line list under [`CART_STORAGE_KEY`].
///
/// Writes are fire-and-forget: a failure is logged and the cart keeps going.
pub struct StorageSync<S: KeyValueStore + ?Sized> {
  store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized + 'static> StorageSync<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Register on `cart` so every change is persisted.
  pub fn attach(self, cart: &mut CartStore) {
    cart.subscribe(move |items| self.persist(items));
  }

  pub fn persist(&self, items: &[CartLine]) {
    let encoded = match serde_json::to_string(items) {
      Ok(encoded) => encoded,
      Err(e) => {
        warn!("Failed to encode cart: {}", e);
        return;
      }
    };

    if let Err(e) = self.store.set(CART_STORAGE_KEY, &encoded) {
      warn!("Failed to persist cart: {}", e);
    }
  }
}
