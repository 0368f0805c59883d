//! # Storefront Error Types
//!
//! Typed error handling for the storefront core.
//! All ledger, checkout, and reconciliation operations return
//! `Result<T, StoreError>`.

use crate::identity::Role;
use thiserror::Error;
use uuid::Uuid;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad input shape (quantity, address, form fields)
    #[error("invalid input: {0}")]
    Validation(String),

    /// Business precondition: checkout requires a non-empty cart
    #[error("cart is empty")]
    EmptyCart,

    /// Product not found in catalog
    #[error("product not found: {product_id}")]
    ProductNotFound { product_id: Uuid },

    /// Cart item not found (or not owned by the acting user)
    #[error("cart item not found: {item_id}")]
    CartItemNotFound { item_id: Uuid },

    /// Order not found
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: Uuid },

    /// Acting identity does not hold the required role
    #[error("permission denied: requires {required} role")]
    Permission { required: Role },

    /// Payment provider API error
    #[error("provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Network/HTTP error communicating with the provider
    #[error("network error: {0}")]
    Network(String),

    /// Configuration errors (missing keys, invalid config)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Webhook signature verification failed
    #[error("webhook verification failed: {0}")]
    WebhookVerification(String),

    /// Webhook payload parsing error
    #[error("webhook parse error: {0}")]
    WebhookParse(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true if retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Network(_) | StoreError::Provider { .. })
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Validation(_) => 400,
            StoreError::EmptyCart => 409,
            StoreError::ProductNotFound { .. } => 404,
            StoreError::CartItemNotFound { .. } => 404,
            StoreError::OrderNotFound { .. } => 404,
            StoreError::Permission { .. } => 403,
            StoreError::Provider { .. } => 502,
            StoreError::Network(_) => 503,
            StoreError::Configuration(_) => 500,
            StoreError::WebhookVerification(_) => 401,
            StoreError::WebhookParse(_) => 400,
            StoreError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::Network("timeout".into()).is_retryable());
        assert!(StoreError::Provider {
            provider: "stripe".into(),
            message: "internal".into()
        }
        .is_retryable());
        assert!(!StoreError::Validation("bad quantity".into()).is_retryable());
        assert!(!StoreError::EmptyCart.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::Validation("q".into()).status_code(), 400);
        assert_eq!(StoreError::EmptyCart.status_code(), 409);
        assert_eq!(
            StoreError::ProductNotFound {
                product_id: Uuid::nil()
            }
            .status_code(),
            404
        );
        assert_eq!(
            StoreError::Permission {
                required: Role::Buyer
            }
            .status_code(),
            403
        );
        assert_eq!(StoreError::Network("down".into()).status_code(), 503);
    }
}
