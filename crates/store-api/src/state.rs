//! # Application State
//!
//! Shared state for the axum application: the in-process stores behind
//! their locks, the payment provider, and configuration. Every handler
//! takes a lock for exactly one store operation, which is the only
//! consistency mechanism the storefront has — no multi-operation
//! transaction wraps a read-then-increment across requests.

use crate::auth::{TokenSigner, UserDirectory};
use std::sync::Arc;
use store_core::{
    BoxedPaymentProvider, CartLedger, CheckoutUrls, Currency, OrderBook, ProductCatalog,
};
use store_stripe::StripeCheckout;
use tokio::sync::RwLock;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for provider redirect targets
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// The single currency all payment sessions use
    pub currency: Currency,
    /// Secret for signing identity tokens
    pub token_secret: String,
    /// Identity token lifetime, in minutes
    pub token_ttl_minutes: i64,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            currency: std::env::var("CURRENCY")
                .ok()
                .and_then(|c| Currency::from_code(&c))
                .unwrap_or_default(),
            token_secret: std::env::var("AUTH_TOKEN_SECRET")
                .unwrap_or_else(|_| "dev-only-token-secret".to_string()),
            token_ttl_minutes: std::env::var("AUTH_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Product catalog (seeded from config, Admin/Seller-mutable)
    pub catalog: Arc<RwLock<ProductCatalog>>,
    /// Cart ledger
    pub ledger: Arc<RwLock<CartLedger>>,
    /// Order book
    pub orders: Arc<RwLock<OrderBook>>,
    /// Registered users
    pub users: Arc<RwLock<UserDirectory>>,
    /// Payment provider
    pub provider: BoxedPaymentProvider,
    /// Provider redirect targets
    pub urls: CheckoutUrls,
    /// Identity token signer
    pub tokens: TokenSigner,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the production state: env config, seeded catalog, Stripe
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_product_catalog()?;

        let provider = StripeCheckout::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        Ok(Self::with_parts(config, catalog, Arc::new(provider)))
    }

    /// Assemble state from explicit parts (also the test entry point)
    pub fn with_parts(
        config: AppConfig,
        catalog: ProductCatalog,
        provider: BoxedPaymentProvider,
    ) -> Self {
        let urls = CheckoutUrls::new(&config.base_url);
        let tokens = TokenSigner::new(&config.token_secret, config.token_ttl_minutes);

        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            ledger: Arc::new(RwLock::new(CartLedger::new())),
            orders: Arc::new(RwLock::new(OrderBook::new())),
            users: Arc::new(RwLock::new(UserDirectory::new())),
            provider,
            urls,
            tokens,
            config,
        }
    }
}

/// Load the seed catalog from config/products.toml
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    tracing::warn!("No product catalog found, starting empty");
    Ok(ProductCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("BASE_URL");
        std::env::remove_var("CURRENCY");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.token_ttl_minutes, 30);
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
            currency: Currency::USD,
            token_secret: "secret".to_string(),
            token_ttl_minutes: 30,
        };

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3000");
    }
}
