//! # store-core
//!
//! Core types and services for the storefront backend.
//!
//! This crate provides:
//! - `User`, `Product`, `Order` and `Payment` records
//! - `Store` trait for the document store, with `MemoryStore`
//! - `PaymentGateway` trait for the payment provider
//! - `checkout::place_order` for order placement with stock reconciliation
//! - `billing` for payment intents, refunds and webhook reconciliation
//! - `customers` for profile management and soft delete
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use store_core::{checkout, Currency, MemoryStore, OrderLine, OrderRequest};
//!
//! let store = MemoryStore::new();
//! let request = OrderRequest {
//!     items: vec![OrderLine { product_id: mug.id.clone(), quantity: 2 }],
//!     shipping_address: None,
//! };
//! let order = checkout::place_order(&store, &customer, request, Currency::USD).await?;
//!
//! let started = billing::start_payment(&store, &gateway, &customer, &order.id).await?;
//! // hand started.intent.client_secret to the client
//! ```

pub mod billing;
pub mod checkout;
pub mod customers;
pub mod error;
pub mod gateway;
pub mod money;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod product;
pub mod store;
pub mod user;
pub mod validate;

// Re-exports for convenience
pub use error::{ShopError, ShopResult};
pub use gateway::{
    BoxedPaymentGateway, GatewayEvent, GatewayEventKind, GatewayRefund, IntentRequest,
    PaymentGateway, PaymentIntent, PaymentMethod, RefundRequest,
};
pub use money::{Currency, Price};
pub use order::{Order, OrderItem, OrderLine, OrderRequest, OrderStats, OrderStatus, PaymentStatus};
pub use pagination::{Page, PageRequest, Pagination};
pub use payment::{Payment, Refund, RefundReason, RefundStatus};
pub use product::{Product, ProductCatalog, ProductDraft, ProductPatch};
pub use store::{
    CustomerQuery, CustomerSort, MemoryStore, OrderFilter, PaymentOutcome, Removal, SharedStore,
    SortOrder, Store,
};
pub use user::{ProfileUpdate, Role, User, UserStatus};
