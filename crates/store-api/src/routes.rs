//! # Routes
//!
//! Axum router for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Identity:
///   - POST /auth/register - Create a user with a role
///   - POST /auth/login - Issue an identity token
///
/// - Catalog:
///   - GET  /products - List products (optional ?search= filter)
///   - GET  /products/{product_id} - Get product by id
///   - POST /products - Create product (Admin/Seller)
///
/// - Cart (Buyer):
///   - GET  /cart - View cart lines and total
///   - POST /cart/add/{product_id} - Add/increment an item
///   - POST /cart/update/{item_id} - Set an item's quantity
///   - POST /cart/remove/{item_id} - Remove an item
///
/// - Checkout (Buyer):
///   - GET  /checkout - Checkout preview
///   - POST /checkout - Submit checkout, returns provider redirect
///   - GET  /checkout/success - Success redirect target
///   - GET  /checkout/cancel - Cancel redirect target
///   - GET  /orders - List own orders
///
/// - Webhooks:
///   - POST /webhook/stripe - Signed Stripe notifications
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let product_routes = Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/{product_id}", get(handlers::get_product));

    let cart_routes = Router::new()
        .route("/", get(handlers::view_cart))
        .route("/add/{product_id}", post(handlers::add_to_cart))
        .route("/update/{item_id}", post(handlers::update_cart_item))
        .route("/remove/{item_id}", post(handlers::remove_from_cart));

    let checkout_routes = Router::new()
        .route(
            "/",
            get(handlers::checkout_preview).post(handlers::submit_checkout),
        )
        .route("/success", get(handlers::checkout_success))
        .route("/cancel", get(handlers::checkout_cancel));

    // webhooks take the raw body; no CORS
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/auth", auth_routes)
        .nest("/products", product_routes)
        .nest("/cart", cart_routes)
        .nest("/checkout", checkout_routes)
        .route("/orders", get(handlers::list_orders))
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
