//! # Orders
//!
//! A checkout attempt's durable record. Status is monotonic: an order
//! starts Pending and moves to Paid or Cancelled at most once; terminal
//! states never revert.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Order lifecycle: Pending -> Paid | Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// One checkout attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: String,
    pub billing_address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// In-process store of orders, keyed by order id
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: HashMap<Uuid, Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new Pending order
    pub fn create(
        &mut self,
        user_id: Uuid,
        shipping_address: impl Into<String>,
        billing_address: impl Into<String>,
    ) -> Order {
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            shipping_address: shipping_address.into(),
            billing_address: billing_address.into(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        self.orders.insert(order.id, order.clone());
        order
    }

    pub fn get(&self, order_id: Uuid) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// A user's orders, newest first
    pub fn orders_for(&self, user_id: Uuid) -> Vec<&Order> {
        let mut found: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Transition an order to Paid.
    ///
    /// Returns `Ok(true)` when the order moved Pending -> Paid, and
    /// `Ok(false)` when it was already Paid (a replayed notification is a
    /// no-op). A Cancelled order is never resurrected.
    pub fn mark_paid(&mut self, order_id: Uuid) -> StoreResult<bool> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound { order_id })?;
        match order.status {
            OrderStatus::Pending => {
                order.status = OrderStatus::Paid;
                Ok(true)
            }
            OrderStatus::Paid => Ok(false),
            OrderStatus::Cancelled => Err(StoreError::Validation(format!(
                "order {} is cancelled and cannot be paid",
                order_id
            ))),
        }
    }

    /// Cancel an order if it is still Pending. Terminal orders are left
    /// untouched; returns whether a transition happened.
    pub fn cancel_if_pending(&mut self, order_id: Uuid) -> StoreResult<bool> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound { order_id })?;
        if order.status == OrderStatus::Pending {
            order.status = OrderStatus::Cancelled;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
