//! # store-core
//!
//! Core domain types and checkout flow for storefront-rs.
//!
//! This crate provides:
//! - `CartLedger` for per-user carts with quantity invariants
//! - `OrderBook` with monotonic Pending -> Paid | Cancelled orders
//! - `checkout::submit` to turn a cart into an order plus a payment-session request
//! - `reconcile` for success/cancel redirects and webhook finalization
//! - `PaymentProvider` trait as the seam to the hosted payment provider
//! - `Identity`/`Role` capability checks and `StoreError` for typed errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use store_core::{checkout, reconcile, CartLedger, CheckoutUrls, Currency, OrderBook};
//!
//! let mut ledger = CartLedger::new();
//! let mut orders = OrderBook::new();
//!
//! ledger.add_item(user_id, &product, 2)?;
//!
//! let (order, request) = checkout::submit(
//!     &ledger, &mut orders, user_id,
//!     "1 Main St", "1 Main St",
//!     Currency::USD, &CheckoutUrls::new("https://shop.example.com"),
//! )?;
//!
//! let handle = provider.create_session(&request).await?;
//! // Redirect the buyer to handle.redirect_url
//! ```

pub mod cart;
pub mod checkout;
pub mod error;
pub mod identity;
pub mod order;
pub mod product;
pub mod provider;
pub mod reconcile;

// Re-exports for convenience
pub use cart::{Cart, CartItem, CartLedger, CartLine};
pub use error::{StoreError, StoreResult};
pub use identity::{require_any, require_role, Identity, Role};
pub use order::{Order, OrderBook, OrderStatus};
pub use product::{Currency, Price, Product, ProductCatalog};
pub use provider::{
    BoxedPaymentProvider, CheckoutUrls, PaymentEvent, PaymentEventKind, PaymentProvider,
    PaymentSessionHandle, PaymentSessionRequest, SessionLineItem,
};
pub use reconcile::{CancelOutcome, CartOutcome, Finalized};
