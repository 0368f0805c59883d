//! # Cart Ledger
//!
//! Per-user carts and cart items. Invariants:
//!
//! - at most one cart per user (`get_or_create` is idempotent),
//! - one item row per (cart, product) pair; adding an existing product
//!   increments its quantity instead of duplicating the row,
//! - quantity is always >= 1.
//!
//! The ledger is role-agnostic; Buyer-role enforcement happens at the
//! request boundary before any of these operations are invoked. Callers
//! share the ledger behind a lock and hold it for exactly one operation,
//! so each create/update/delete is atomic but nothing wraps a
//! read-then-increment sequence across two requests. Two concurrent
//! `add_item` calls for the same product can therefore under-count; see
//! DESIGN.md.

use crate::error::{StoreError, StoreResult};
use crate::product::{Currency, Price, Product};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A user's cart. Created lazily on first add; never deleted (its items are).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One (cart, product) row. Name and unit price are captured from the
/// product at add time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// The derived line total: quantity x unit price
    pub fn line_total(&self) -> Price {
        Price::from_minor(
            self.unit_price.amount * self.quantity as i64,
            self.unit_price.currency,
        )
    }
}

/// A cart item together with its derived line total, as listed to callers
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub line_total: Price,
}

/// In-process store of carts and their items, keyed by owner
#[derive(Debug, Default)]
pub struct CartLedger {
    carts: HashMap<Uuid, Cart>,
    // items are kept in insertion order per cart
    items: HashMap<Uuid, Vec<CartItem>>,
}

impl CartLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the user's cart, creating it on first use. Idempotent.
    pub fn get_or_create(&mut self, user_id: Uuid) -> Cart {
        self.carts
            .entry(user_id)
            .or_insert_with(|| Cart {
                id: Uuid::new_v4(),
                user_id,
                created_at: Utc::now(),
            })
            .clone()
    }

    /// The user's cart, if one has been created
    pub fn cart_for(&self, user_id: Uuid) -> Option<&Cart> {
        self.carts.get(&user_id)
    }

    /// Add `delta` units of `product` to the user's cart.
    ///
    /// Increments the existing (cart, product) row if present, otherwise
    /// creates one. Fails with a validation error if the resulting
    /// quantity would drop below 1.
    pub fn add_item(&mut self, user_id: Uuid, product: &Product, delta: i32) -> StoreResult<CartItem> {
        let cart = self.get_or_create(user_id);
        let rows = self.items.entry(cart.id).or_default();

        if let Some(existing) = rows.iter_mut().find(|i| i.product_id == product.id) {
            let next = existing.quantity as i64 + delta as i64;
            if next < 1 {
                return Err(StoreError::Validation(format!(
                    "quantity must be at least 1, got {}",
                    next
                )));
            }
            existing.quantity = next as u32;
            existing.name = product.name.clone();
            existing.unit_price = product.unit_price;
            return Ok(existing.clone());
        }

        if delta < 1 {
            return Err(StoreError::Validation(format!(
                "quantity must be at least 1, got {}",
                delta
            )));
        }

        let item = CartItem {
            id: Uuid::new_v4(),
            cart_id: cart.id,
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.unit_price,
            quantity: delta as u32,
            added_at: Utc::now(),
        };
        rows.push(item.clone());
        Ok(item)
    }

    /// Overwrite an item's quantity. Zero is rejected; non-integer input
    /// never reaches the ledger (the request boundary rejects it first).
    pub fn set_quantity(&mut self, user_id: Uuid, item_id: Uuid, quantity: u32) -> StoreResult<CartItem> {
        if quantity < 1 {
            return Err(StoreError::Validation(
                "quantity must be a positive integer".into(),
            ));
        }
        let item = self
            .item_mut(user_id, item_id)
            .ok_or(StoreError::CartItemNotFound { item_id })?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    /// Delete an item. Removing an id that no longer exists is a no-op,
    /// so a replayed remove is safe. Returns whether a row was deleted.
    pub fn remove_item(&mut self, user_id: Uuid, item_id: Uuid) -> bool {
        let Some(cart) = self.carts.get(&user_id) else {
            return false;
        };
        let Some(rows) = self.items.get_mut(&cart.id) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|i| i.id != item_id);
        rows.len() < before
    }

    /// The user's cart lines in insertion order, each with its derived
    /// line total. An absent cart lists as empty.
    pub fn lines(&self, user_id: Uuid) -> Vec<CartLine> {
        self.carts
            .get(&user_id)
            .and_then(|cart| self.items.get(&cart.id))
            .map(|rows| {
                rows.iter()
                    .map(|item| CartLine {
                        line_total: item.line_total(),
                        item: item.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sum of all line totals in the given currency
    pub fn total(&self, user_id: Uuid, currency: Currency) -> Price {
        let amount = self
            .lines(user_id)
            .iter()
            .map(|line| line.line_total.amount)
            .sum();
        Price::from_minor(amount, currency)
    }

    /// Number of item rows in the user's cart
    pub fn item_count(&self, user_id: Uuid) -> usize {
        self.carts
            .get(&user_id)
            .and_then(|cart| self.items.get(&cart.id))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Delete every item in the user's cart in one step; the cart record
    /// itself survives. Returns the number of rows removed, so a second
    /// call reports 0 and is a no-op.
    pub fn clear(&mut self, user_id: Uuid) -> usize {
        let Some(cart) = self.carts.get(&user_id) else {
            return 0;
        };
        match self.items.get_mut(&cart.id) {
            Some(rows) => {
                let removed = rows.len();
                rows.clear();
                removed
            }
            None => 0,
        }
    }

    fn item_mut(&mut self, user_id: Uuid, item_id: Uuid) -> Option<&mut CartItem> {
        let cart_id = self.carts.get(&user_id)?.id;
        self.items
            .get_mut(&cart_id)?
            .iter_mut()
            .find(|i| i.id == item_id)
    }
}
