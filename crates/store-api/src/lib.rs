//! # store-api
//!
//! HTTP API layer for storefront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server with shared in-process stores
//! - Identity endpoints (register/login) issuing signed bearer tokens
//! - Cart, checkout, and catalog endpoints with per-handler role checks
//! - The Stripe webhook endpoint that finalizes orders
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/auth/register` | Register with a role |
//! | POST | `/auth/login` | Issue identity token |
//! | GET | `/products` | List products |
//! | POST | `/cart/add/{id}` | Add to cart |
//! | POST | `/checkout` | Submit checkout |
//! | POST | `/webhook/stripe` | Stripe webhook |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
