//! # store-stripe
//!
//! Stripe implementation of the storefront's `PaymentProvider` seam.
//!
//! - `StripeCheckout` creates hosted Checkout Sessions (mode=payment) with
//!   one line item per cart line and the local order id in session
//!   metadata, reused as the idempotency key.
//! - Webhook notifications are verified against the signing secret
//!   (HMAC-SHA256 with a timestamp tolerance) before the reconciler sees
//!   them.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use store_stripe::StripeCheckout;
//! use store_core::PaymentProvider;
//!
//! let provider = StripeCheckout::from_env()?;
//! let handle = provider.create_session(&request).await?;
//! // Redirect the buyer to handle.redirect_url
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckout;
pub use config::StripeConfig;
