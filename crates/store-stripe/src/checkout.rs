//! # Stripe Checkout Sessions
//!
//! Implementation of the `PaymentProvider` seam against Stripe's Checkout
//! Sessions API. Uses Stripe's hosted checkout page; the storefront never
//! touches card data.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use store_core::{
    PaymentEvent, PaymentProvider, PaymentSessionHandle, PaymentSessionRequest, StoreError,
    StoreResult,
};
use tracing::{debug, error, info, instrument, warn};

/// Stripe Checkout Sessions provider
pub struct StripeCheckout {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckout {
    /// Create a new Stripe provider from an explicit config
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Build the form body for the Checkout Sessions API
    fn build_form_params(request: &PaymentSessionRequest) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (
                "metadata[order_id]".to_string(),
                request.order_id.to_string(),
            ),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            form_params.push((
                format!("line_items[{}][price_data][currency]", i),
                item.currency.as_str().to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                item.unit_amount.to_string(),
            ));
            form_params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.name.clone(),
            ));
            form_params.push((
                format!("line_items[{}][quantity]", i),
                item.quantity.to_string(),
            ));
        }

        form_params
    }

    /// POST the session request, retrying exactly once on a transport
    /// failure. Provider-side validation errors come back as HTTP error
    /// statuses and are never retried.
    async fn post_session(
        &self,
        url: &str,
        idempotency_key: &str,
        form_params: &[(String, String)],
    ) -> StoreResult<reqwest::Response> {
        let send = || {
            self.client
                .post(url)
                .header("Authorization", self.config.auth_header())
                .header("Stripe-Version", &self.config.api_version)
                .header("Idempotency-Key", idempotency_key)
                .form(form_params)
                .send()
        };

        match send().await {
            Ok(response) => Ok(response),
            Err(first) => {
                warn!("transient provider failure, retrying once: {}", first);
                send()
                    .await
                    .map_err(|e| StoreError::Network(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeCheckout {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> StoreResult<PaymentSessionHandle> {
        if request.line_items.is_empty() {
            return Err(StoreError::Validation(
                "payment session has no line items".to_string(),
            ));
        }

        let form_params = Self::build_form_params(request);

        debug!(
            "creating Stripe checkout session: {} line items",
            request.line_items.len()
        );

        // the order id doubles as the idempotency key, so re-submitting
        // the same order cannot create a second session charge
        let idempotency_key = request.order_id.to_string();
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .post_session(&url, &idempotency_key, &form_params)
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(StoreError::Provider {
                    provider: "stripe".to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(StoreError::Provider {
                provider: "stripe".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let session: StripeSessionResponse = serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("failed to parse Stripe response: {}", e))
        })?;

        info!(
            "created Stripe checkout session: id={}, url={}",
            session.id, session.url
        );

        let expires_at = session
            .expires_at
            .map(|ts| DateTime::from_timestamp(ts, 0).unwrap_or(Utc::now() + Duration::hours(24)));

        Ok(PaymentSessionHandle {
            session_id: session.id,
            redirect_url: session.url,
            expires_at,
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> StoreResult<PaymentEvent> {
        webhook::verify_and_parse(&self.config.webhook_secret, payload, signature)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    url: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use store_core::{Currency, SessionLineItem};
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(order_id: Uuid) -> PaymentSessionRequest {
        PaymentSessionRequest {
            order_id,
            line_items: vec![
                SessionLineItem {
                    name: "Mug".into(),
                    unit_amount: 999,
                    quantity: 2,
                    currency: Currency::USD,
                },
                SessionLineItem {
                    name: "Lamp".into(),
                    unit_amount: 500,
                    quantity: 1,
                    currency: Currency::USD,
                },
            ],
            success_url: "https://shop.example.com/checkout/success".into(),
            cancel_url: "https://shop.example.com/checkout/cancel".into(),
        }
    }

    fn provider_for(server_uri: &str) -> StripeCheckout {
        let config = StripeConfig::new("sk_test_abc", "whsec_test")
            .with_api_base_url(server_uri)
            .with_timeout_secs(5);
        StripeCheckout::new(config)
    }

    #[test]
    fn test_form_params_shape() {
        let order_id = Uuid::new_v4();
        let params = StripeCheckout::build_form_params(&request(order_id));

        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("metadata[order_id]"), Some(order_id.to_string()).as_deref());
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("999"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[1][price_data][unit_amount]"), Some("500"));
        assert_eq!(get("line_items[1][price_data][currency]"), Some("usd"));
    }

    #[tokio::test]
    async fn test_create_session_success() {
        let server = MockServer::start().await;
        let order_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Idempotency-Key", order_id.to_string().as_str()))
            .and(body_string_contains("mode=payment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "url": "https://checkout.stripe.com/c/pay/cs_test_123",
                "expires_at": Utc::now().timestamp() + 86400
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server.uri());
        let handle = provider.create_session(&request(order_id)).await.unwrap();

        assert_eq!(handle.session_id, "cs_test_123");
        assert!(handle.redirect_url.contains("cs_test_123"));
        assert!(handle.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_provider_error_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Invalid currency: xyz" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server.uri());
        let err = provider
            .create_session(&request(Uuid::new_v4()))
            .await
            .unwrap_err();

        match err {
            StoreError::Provider { provider, message } => {
                assert_eq!(provider, "stripe");
                assert!(message.contains("Invalid currency"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_line_items_rejected_locally() {
        let provider = provider_for("http://127.0.0.1:1");
        let mut req = request(Uuid::new_v4());
        req.line_items.clear();

        let err = provider.create_session(&req).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        // nothing listens here; both the first attempt and the single
        // retry fail at the transport layer
        let provider = provider_for("http://127.0.0.1:1");
        let err = provider
            .create_session(&request(Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Network(_)));
    }
}
