//! Subcommand handlers: catalog browsing, cart actions and checkout.

use clap::Subcommand;
use color_eyre::Result;
use std::io::Write;

use crate::cart::{CartLine, CartStore};
use crate::shop::{CachedShopClient, Product, ProductApi, ProductId};
use crate::storage::KeyValueStore;

const TITLE_WIDTH: usize = 48;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List products
  Products {
    /// Only show products of this category
    #[arg(short, long)]
    category: Option<String>,
    /// Print the API's JSON instead of a table
    #[arg(long)]
    json: bool,
  },
  /// Show a single product
  Product {
    id: ProductId,
    #[arg(long)]
    json: bool,
  },
  /// List product categories
  Categories,
  /// Inspect or change the cart
  #[command(subcommand)]
  Cart(CartAction),
  /// Print the order summary and empty the cart
  Checkout,
}

#[derive(Subcommand, Debug)]
pub enum CartAction {
  /// Show cart contents and totals
  Show,
  /// Add a product to the cart
  Add {
    id: ProductId,
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,
  },
  /// Remove a product from the cart
  Remove { id: ProductId },
  /// Set the quantity of a product already in the cart (0 or less removes it)
  Set {
    id: ProductId,
    #[arg(allow_hyphen_values = true)]
    quantity: i64,
  },
  /// Remove everything from the cart
  Clear,
}

/// Run a subcommand, writing user-facing output to `out`.
pub async fn run<A, S, W>(
  command: Command,
  shop: &CachedShopClient<A, S>,
  cart: &mut CartStore,
  out: &mut W,
) -> Result<()>
where
  A: ProductApi,
  S: KeyValueStore + ?Sized,
  W: Write,
{
  match command {
    Command::Products { category, json } => {
      if json && category.is_none() {
        writeln!(out, "{}", serde_json::to_string_pretty(&shop.fetch_products().await?)?)?;
        return Ok(());
      }

      let products = match category.as_deref() {
        Some(category) => shop.products_in_category(category).await?,
        None => shop.products().await?,
      };

      if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&products)?)?;
      } else {
        for product in &products {
          writeln!(out, "{}", product_row(product))?;
        }
      }
    }
    Command::Product { id, json } => {
      if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&shop.fetch_product_by_id(&id).await?)?)?;
      } else {
        write!(out, "{}", product_detail(&shop.product(&id).await?))?;
      }
    }
    Command::Categories => {
      for category in shop.categories().await? {
        writeln!(out, "{}", category)?;
      }
    }
    Command::Cart(action) => run_cart(action, shop, cart, out).await?,
    Command::Checkout => {
      if cart.is_empty() {
        writeln!(out, "Your cart is empty")?;
        return Ok(());
      }
      write!(out, "{}", cart_summary(cart))?;
      writeln!(out, "Order placed.")?;
      cart.clear_cart();
    }
  }

  Ok(())
}

async fn run_cart<A, S, W>(
  action: CartAction,
  shop: &CachedShopClient<A, S>,
  cart: &mut CartStore,
  out: &mut W,
) -> Result<()>
where
  A: ProductApi,
  S: KeyValueStore + ?Sized,
  W: Write,
{
  match action {
    CartAction::Show => {
      if cart.is_empty() {
        writeln!(out, "Your cart is empty")?;
      } else {
        write!(out, "{}", cart_summary(cart))?;
      }
    }
    CartAction::Add { id, quantity } => {
      let product = shop.product(&id).await?;
      let title = product.title.clone();
      cart.add_item(product, quantity)?;
      writeln!(
        out,
        "Added {} x {} ({} items, ${})",
        quantity,
        title,
        cart.item_count(),
        cart.cart_total()
      )?;
    }
    CartAction::Remove { id } => {
      if cart.remove_item(&id) {
        writeln!(out, "Removed product {}", id)?;
      } else {
        writeln!(out, "Product {} is not in the cart", id)?;
      }
    }
    CartAction::Set { id, quantity } => {
      if cart.update_quantity(&id, quantity) {
        writeln!(out, "Cart now holds {} items, ${}", cart.item_count(), cart.cart_total())?;
      } else {
        writeln!(out, "Product {} is not in the cart", id)?;
      }
    }
    CartAction::Clear => {
      cart.clear_cart();
      writeln!(out, "Cart cleared")?;
    }
  }

  Ok(())
}

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

fn product_row(product: &Product) -> String {
  format!(
    "{:>6}  {:>9.2}  {}",
    product.id,
    product.price,
    truncate(&product.title, TITLE_WIDTH)
  )
}

fn product_detail(product: &Product) -> String {
  let mut detail = format!(
    "{}\n  id:       {}\n  price:    ${:.2}\n",
    product.title, product.id, product.price
  );
  if let Some(category) = &product.category {
    detail.push_str(&format!("  category: {}\n", category));
  }
  if let Some(description) = &product.description {
    detail.push_str(&format!("\n{}\n", description));
  }
  detail
}

fn cart_line_row(line: &CartLine) -> String {
  format!(
    "{:>6}  {:>4} x {:>9.2}  = {:>10.2}  {}",
    line.product.id,
    line.quantity,
    line.product.price,
    line.subtotal(),
    truncate(&line.product.title, TITLE_WIDTH)
  )
}

fn cart_summary(cart: &CartStore) -> String {
  let mut summary = String::new();
  for line in cart.cart_items() {
    summary.push_str(&cart_line_row(line));
    summary.push('\n');
  }
  summary.push_str(&format!("Items: {}\nTotal: ${}\n", cart.item_count(), cart.cart_total()));
  summary
}
