//! Shopping cart state and its persistent mirror.

mod store;
mod sync;

pub use store::{CartLine, CartStore};
pub use sync::StorageSync;
