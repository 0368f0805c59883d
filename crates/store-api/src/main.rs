//! # Storefront RS
//!
//! Small e-commerce storefront: catalog, per-user carts, checkout through
//! Stripe's hosted payment page, and webhook-driven order finalization.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export AUTH_TOKEN_SECRET=...
//!
//! # Run the server
//! storefront
//! ```

use store_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Currency: {}", state.config.currency);
    info!(
        "Products loaded: {}",
        state.catalog.read().await.products.len()
    );
    info!("Payment provider: {}", state.provider.provider_name());

    let app = routes::create_router(state);

    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Catalog:  GET  http://{}/products", addr);
        info!("Checkout: POST http://{}/checkout", addr);
        info!("Webhook:  POST http://{}/webhook/stripe", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
