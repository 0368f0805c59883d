//! # Payment Provider Seam
//!
//! The storefront hands a built payment-session request to an external
//! hosted provider and redirects the buyer to the URL it returns. Each
//! provider (Stripe today) implements [`PaymentProvider`]; the rest of the
//! system only sees this trait, so the provider can be swapped without
//! touching the checkout flow.

use crate::error::StoreResult;
use crate::product::Currency;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One priced, quantified entry sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLineItem {
    /// Product display name
    pub name: String,
    /// Unit price in minor currency units (999 for $9.99)
    pub unit_amount: i64,
    /// Quantity
    pub quantity: u32,
    /// Currency (fixed per deployment)
    pub currency: Currency,
}

/// A payment-session request built by the checkout orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSessionRequest {
    /// The local order this session pays for; carried in session metadata
    /// and reused as the idempotency key, so re-submitting the same order
    /// cannot create a second charge.
    pub order_id: Uuid,
    /// One line item per cart line
    pub line_items: Vec<SessionLineItem>,
    /// Absolute URL the provider redirects to after payment
    pub success_url: String,
    /// Absolute URL the provider redirects to on abandonment
    pub cancel_url: String,
}

/// The provider's handle for a created session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSessionHandle {
    /// Provider's opaque session id
    pub session_id: String,
    /// Hosted payment page to redirect the buyer to
    pub redirect_url: String,
    /// When the session expires, if the provider says
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Kinds of provider notifications the reconciler acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    SessionCompleted,
    SessionExpired,
    PaymentFailed,
    Unknown(String),
}

/// A verified, parsed provider notification
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub event_id: String,
    pub kind: PaymentEventKind,
    pub session_id: Option<String>,
    /// Local order id recovered from session metadata
    pub order_id: Option<Uuid>,
    pub amount_total: Option<i64>,
    pub payment_status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PaymentEvent {
    /// Whether the provider attests the session was actually paid
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

/// Seam to the external hosted payment provider
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment session and return the redirect handle.
    ///
    /// Provider-side failures (network, validation, auth) surface as a
    /// single provider-error kind; the caller reports them to the user and
    /// the flow is retried by re-submitting checkout.
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> StoreResult<PaymentSessionHandle>;

    /// Verify a webhook signature and parse the notification
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> StoreResult<PaymentEvent>;

    /// Provider name, for logging and error reporting
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared provider (dynamic dispatch)
pub type BoxedPaymentProvider = Arc<dyn PaymentProvider>;

/// Redirect targets handed to the provider, computed once from the
/// configured application origin
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the application (e.g., "https://shop.example.com")
    pub base_url: String,
    /// Success page path
    pub success_path: String,
    /// Cancel page path
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            success_path: "/checkout/success".to_string(),
            cancel_path: "/checkout/cancel".to_string(),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}{}", self.base_url, self.success_path)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.base_url, self.cancel_path)
    }

    /// Success URL with the provider's session-id placeholder appended
    pub fn success_url_with_session(&self) -> String {
        format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.success_url())
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
