//! # Request Handlers
//!
//! Axum request handlers for the storefront. Role checks happen here, at
//! the boundary, via explicit `require_role` calls — the ledger and
//! orchestrator below never look at roles. Every error is converted into
//! a user-visible notice plus the safe page to return to; permission
//! failures redirect outright and expose nothing.

use crate::auth::AuthUser;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use store_core::{
    checkout, reconcile, require_any, require_role, CartLine, CartOutcome, PaymentEventKind,
    Price, Product, Role, StoreError,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Error mapping
// =============================================================================

/// Notice body returned for every handler failure except permission ones
#[derive(Debug, Serialize)]
pub struct ErrorNotice {
    pub error: String,
    pub code: u16,
    /// The safe page the client should return to
    pub redirect: &'static str,
}

/// Wrapper turning `StoreError` into a boundary response
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

fn safe_page(err: &StoreError) -> &'static str {
    match err {
        StoreError::EmptyCart
        | StoreError::Validation(_)
        | StoreError::CartItemNotFound { .. }
        | StoreError::Provider { .. }
        | StoreError::Network(_) => "/cart",
        _ => "/products",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;

        // permission failures redirect and never leak detail
        if let StoreError::Permission { required } = &err {
            warn!("permission denied (requires {}), redirecting", required);
            return Redirect::to("/products").into_response();
        }

        let code = err.status_code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let notice = ErrorNotice {
            error: err.to_string(),
            code,
            redirect: safe_page(&err),
        };
        (status, Json(notice)).into_response()
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// "Admin", "Seller", or "Buyer"
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub role: Role,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Decimal price in the configured currency (9.99 means $9.99)
    pub unit_price: f64,
    #[serde(default)]
    pub stock: u32,
}

/// Quantity arrives as a form string; anything that is not a positive
/// integer is a validation error, not a deserialization failure
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    pub quantity: String,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Price,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSubmitRequest {
    pub shipping_address: String,
    pub billing_address: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub session_id: String,
    /// Hosted payment page to send the buyer to
    pub redirect_url: String,
}

#[derive(Debug, Serialize)]
pub struct NoticeResponse {
    pub notice: String,
}

// =============================================================================
// Health & identity
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = Role::from_name(&request.role).ok_or_else(|| {
        StoreError::Validation(format!("unknown role: {}", request.role))
    })?;

    let identity = state
        .users
        .write()
        .await
        .register(&request.username, &request.password, role)?;

    info!("registered {} as {}", identity.username, identity.role);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: identity.user_id,
            username: identity.username,
            role: identity.role,
        }),
    ))
}

#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let identity = state
        .users
        .read()
        .await
        .authenticate(&request.username, &request.password)
        .ok_or_else(|| StoreError::Validation("invalid username or password".into()))?;

    let token = state.tokens.mint(&identity)?;

    Ok(Json(TokenResponse {
        token,
        role: identity.role,
        expires_in_minutes: state.config.token_ttl_minutes,
    }))
}

// =============================================================================
// Catalog
// =============================================================================

pub async fn list_products(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ProductQuery>,
) -> impl IntoResponse {
    let catalog = state.catalog.read().await;
    let products: Vec<Product> = catalog
        .search(query.search.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let catalog = state.catalog.read().await;
    let product = catalog
        .get(product_id)
        .ok_or(StoreError::ProductNotFound { product_id })?;
    Ok(Json(product.clone()))
}

#[instrument(skip(state, auth, request), fields(user = %auth.0.username))]
pub async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_any(&auth.0, &[Role::Admin, Role::Seller])?;

    if request.unit_price <= 0.0 {
        return Err(StoreError::Validation("price must be positive".into()).into());
    }

    let product = Product::new(
        request.name.trim(),
        Price::new(request.unit_price, state.config.currency),
    )
    .with_description(request.description)
    .with_stock(request.stock);

    state.catalog.write().await.add(product.clone())?;

    info!("product created: {} ({})", product.name, product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

// =============================================================================
// Cart
// =============================================================================

async fn cart_view(state: &AppState, user_id: Uuid) -> CartView {
    let ledger = state.ledger.read().await;
    CartView {
        lines: ledger.lines(user_id),
        total: ledger.total(user_id, state.config.currency),
    }
}

pub async fn view_cart(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CartView>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;
    Ok(Json(cart_view(&state, auth.0.user_id).await))
}

#[instrument(skip(state, auth), fields(user = %auth.0.username, product_id = %product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;

    let product = {
        let catalog = state.catalog.read().await;
        catalog
            .get(product_id)
            .cloned()
            .ok_or(StoreError::ProductNotFound { product_id })?
    };
    if !product.active {
        return Err(
            StoreError::Validation(format!("product is not available: {}", product.name)).into(),
        );
    }

    let item = state
        .ledger
        .write()
        .await
        .add_item(auth.0.user_id, &product, 1)?;

    Ok(Json(serde_json::json!({
        "notice": "Item added to cart.",
        "item": item
    })))
}

#[instrument(skip(state, auth, form), fields(user = %auth.0.username, item_id = %item_id))]
pub async fn update_cart_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<Uuid>,
    Form(form): Form<UpdateQuantityForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;

    let quantity: u32 = form
        .quantity
        .trim()
        .parse()
        .map_err(|_| StoreError::Validation("quantity must be a positive integer".into()))?;

    let item = state
        .ledger
        .write()
        .await
        .set_quantity(auth.0.user_id, item_id, quantity)?;

    Ok(Json(serde_json::json!({
        "notice": "Cart updated.",
        "item": item
    })))
}

#[instrument(skip(state, auth), fields(user = %auth.0.username, item_id = %item_id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<NoticeResponse>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;

    // removing an already-removed item is a no-op, not an error
    let removed = state.ledger.write().await.remove_item(auth.0.user_id, item_id);
    debug!(removed, "cart item removal");

    Ok(Json(NoticeResponse {
        notice: "Item removed from cart.".to_string(),
    }))
}

// =============================================================================
// Checkout
// =============================================================================

/// The checkout page: the cart as it will be charged
pub async fn checkout_preview(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CartView>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;

    let view = cart_view(&state, auth.0.user_id).await;
    if view.lines.is_empty() {
        return Err(StoreError::EmptyCart.into());
    }
    Ok(Json(view))
}

#[instrument(skip(state, auth, request), fields(user = %auth.0.username))]
pub async fn submit_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CheckoutSubmitRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;

    // the order is recorded Pending before the provider is contacted
    let (order, session_request) = {
        let ledger = state.ledger.read().await;
        let mut orders = state.orders.write().await;
        checkout::submit(
            &ledger,
            &mut orders,
            auth.0.user_id,
            &request.shipping_address,
            &request.billing_address,
            state.config.currency,
            &state.urls,
        )?
    };

    info!(
        order_id = %order.id,
        items = session_request.line_items.len(),
        "submitting checkout"
    );

    let handle = state
        .provider
        .create_session(&session_request)
        .await
        .map_err(|e| {
            // the Pending order stays behind as the audit record
            error!(order_id = %order.id, "payment session creation failed: {}", e);
            e
        })?;

    Ok(Json(CheckoutResponse {
        order_id: order.id,
        session_id: handle.session_id,
        redirect_url: handle.redirect_url,
    }))
}

#[instrument(skip(state, auth), fields(user = %auth.0.username))]
pub async fn checkout_success(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;

    let outcome = reconcile::on_success(&mut *state.ledger.write().await, auth.0.user_id);

    let (notice, items_cleared) = match outcome {
        CartOutcome::Cleared { items_removed } => (
            "Payment completed successfully! Your cart has been cleared.",
            items_removed,
        ),
        CartOutcome::NothingToClear => ("Payment completed. No cart items to clear.", 0),
    };

    Ok(Json(serde_json::json!({
        "notice": notice,
        "items_cleared": items_cleared
    })))
}

pub async fn checkout_cancel(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = reconcile::on_cancel(&*state.ledger.read().await, auth.0.user_id);

    Ok(Json(serde_json::json!({
        "notice": "Payment was cancelled.",
        "items_retained": outcome.items_retained
    })))
}

/// A buyer's own orders, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_role(&auth.0, Role::Buyer)?;

    let orders = state.orders.read().await;
    let own: Vec<_> = orders
        .orders_for(auth.0.user_id)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(serde_json::json!({
        "orders": own,
        "count": own.len()
    })))
}

// =============================================================================
// Webhook
// =============================================================================

#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            StoreError::WebhookVerification("missing Stripe-Signature header".into())
        })?;

    let event = state.provider.verify_webhook(&body, signature).await?;

    info!("received webhook: kind={:?}, id={}", event.kind, event.event_id);

    match &event.kind {
        PaymentEventKind::SessionCompleted if event.is_paid() => {
            let mut ledger = state.ledger.write().await;
            let mut orders = state.orders.write().await;
            let outcome = reconcile::on_session_completed(&mut ledger, &mut orders, &event)?;
            info!(
                order_id = %outcome.order_id,
                newly_paid = outcome.newly_paid,
                items_cleared = outcome.items_cleared,
                "order finalized from webhook"
            );
        }
        PaymentEventKind::SessionCompleted => {
            warn!("completed session without paid status; ignoring");
        }
        PaymentEventKind::SessionExpired => {
            let mut orders = state.orders.write().await;
            let cancelled = reconcile::on_session_expired(&mut orders, &event)?;
            info!(cancelled, "session expired");
        }
        PaymentEventKind::PaymentFailed => {
            warn!("payment failed for session {:?}", event.session_id);
        }
        PaymentEventKind::Unknown(kind) => {
            debug!("unhandled webhook event: {}", kind);
        }
    }

    Ok(StatusCode::OK)
}
