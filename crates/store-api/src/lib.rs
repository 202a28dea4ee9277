//! # store-api
//!
//! HTTP API layer for storefront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Bearer-token authentication with Argon2 password hashing
//! - REST endpoints for auth, products, orders, customers and payments
//! - The Stripe webhook endpoint that reconciles payments and orders
//!
//! ## Endpoints
//!
//! | Method | Path | Access |
//! |--------|------|--------|
//! | GET | `/health` | public |
//! | POST | `/api/auth/register` | public |
//! | POST | `/api/auth/login` | public |
//! | POST | `/api/auth/create-admin` | admin key |
//! | PUT | `/api/auth/promote/{id}` | admin |
//! | GET | `/api/products`, `/api/products/{id}` | public |
//! | POST, PUT, DELETE | `/api/products[/{id}]` | admin |
//! | POST, GET | `/api/orders` | signed in |
//! | GET | `/api/orders/{id}` | owner or admin |
//! | PUT | `/api/orders/{id}/status` | admin |
//! | GET | `/api/customers` | admin |
//! | GET, PUT | `/api/customers/{id}` | owner or admin |
//! | DELETE | `/api/customers/{id}` | admin |
//! | GET | `/api/customers/{id}/orders` | owner or admin |
//! | POST | `/api/payments/create-payment-intent` | owner or admin |
//! | POST | `/api/payments/webhook` | Stripe signature |
//! | GET | `/api/payments/payment-methods` | signed in |
//! | POST | `/api/payments/refund/{payment_id}` | owner or admin |
//! | GET | `/api/payments/transactions` | signed in |

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use routes::create_router;
pub use state::AppState;
