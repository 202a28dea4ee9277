//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers::{self, auth, customers, orders, payments, products};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - `/api/auth`: register, login, create-admin, promote/{id}
/// - `/api/products`: list, create, get/update/delete by id
/// - `/api/orders`: create, list own, get by id, update status
/// - `/api/customers`: list, overview/update/delete by id, orders by id
/// - `/api/payments`: create-payment-intent, webhook, payment-methods,
///   refund/{payment_id}, transactions
/// - `/health`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/create-admin", post(auth::create_admin))
        .route("/promote/{id}", put(auth::promote));

    let product_routes = Router::new()
        .route(
            "/",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        );

    let order_routes = Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/{id}", get(orders::get_order))
        .route("/{id}/status", put(orders::update_order_status));

    let customer_routes = Router::new()
        .route("/", get(customers::list_customers))
        .route(
            "/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/{id}/orders", get(customers::customer_orders));

    // webhook reads the raw body for signature verification
    let payment_routes = Router::new()
        .route(
            "/create-payment-intent",
            post(payments::create_payment_intent),
        )
        .route("/webhook", post(payments::webhook))
        .route("/payment-methods", get(payments::payment_methods))
        .route("/refund/{payment_id}", post(payments::refund))
        .route("/transactions", get(payments::transactions));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/products", product_routes)
        .nest("/orders", order_routes)
        .nest("/customers", customer_routes)
        .nest("/payments", payment_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
