//! # Document Store
//!
//! Persistence seam for users, products, orders and payments.
//!
//! Mutations that must not interleave with concurrent requests (stock
//! reservation, product and profile patches, customer removal, webhook
//! transitions, refunds) are single trait methods, so an implementation can
//! run each one inside one critical section or transaction. None of them
//! take a whole record from the caller: a stale copy would overwrite fields
//! changed in the meantime.

mod memory;

pub use memory::MemoryStore;

use crate::error::ShopResult;
use crate::order::{Order, OrderLine, OrderStats, OrderStatus};
use crate::pagination::{Page, PageRequest};
use crate::payment::{Payment, Refund};
use crate::product::{Product, ProductPatch};
use crate::user::{ProfileUpdate, User};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Sortable customer fields
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSort {
    #[default]
    CreatedAt,
    Name,
    Email,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Customer listing parameters
#[derive(Debug, Clone, Default)]
pub struct CustomerQuery {
    /// Case-insensitive substring matched against name and email
    pub search: Option<String>,
    pub sort_by: CustomerSort,
    pub order: SortOrder,
    pub page: PageRequest,
}

/// Order listing filter; results are newest first
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<String>,
    pub status: Option<OrderStatus>,
}

/// What removing a customer did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Customer had orders and was marked inactive
    Deactivated,
    /// Customer had no orders and was deleted
    Deleted,
}

/// Result of a webhook-driven payment transition
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Succeeded,
    Failed { reason: Option<String> },
}

#[async_trait]
pub trait Store: Send + Sync {
    // ---- users -----------------------------------------------------------

    /// Insert a user; fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: User) -> ShopResult<User>;

    async fn find_user(&self, id: &str) -> ShopResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>>;

    /// Apply a profile update in place; fails with `Conflict` when the new
    /// email belongs to another user.
    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> ShopResult<User>;

    /// Give a user the admin role.
    async fn promote_user(&self, id: &str) -> ShopResult<User>;

    /// Link a user to their customer record at the payment gateway.
    async fn set_gateway_customer(&self, id: &str, gateway_customer_id: &str) -> ShopResult<User>;

    /// Deactivate a customer who has orders, delete one who has none. The
    /// order check and the removal happen in one step.
    async fn remove_customer(&self, id: &str) -> ShopResult<Removal>;

    /// Customers (role `customer`) matching the query, one page at a time.
    async fn list_customers(&self, query: &CustomerQuery) -> ShopResult<Page<User>>;

    // ---- products --------------------------------------------------------

    async fn insert_product(&self, product: Product) -> ShopResult<Product>;

    async fn find_product(&self, id: &str) -> ShopResult<Option<Product>>;

    /// All products, oldest first.
    async fn list_products(&self) -> ShopResult<Vec<Product>>;

    /// Apply a partial update in place. Stock reserved concurrently is
    /// untouched unless the patch sets `stock` itself.
    async fn patch_product(&self, id: &str, patch: ProductPatch) -> ShopResult<Product>;

    async fn delete_product(&self, id: &str) -> ShopResult<bool>;

    /// Atomically check and decrement stock for every line.
    ///
    /// Either every line is reserved or nothing changes. Returns the product
    /// snapshot for each line, in line order.
    async fn reserve_stock(&self, lines: &[OrderLine]) -> ShopResult<Vec<Product>>;

    /// Give back stock taken by `reserve_stock`.
    async fn release_stock(&self, lines: &[OrderLine]) -> ShopResult<()>;

    // ---- orders ----------------------------------------------------------

    async fn insert_order(&self, order: Order) -> ShopResult<Order>;

    async fn find_order(&self, id: &str) -> ShopResult<Option<Order>>;

    /// Set an order's fulfillment status in place, leaving its payment
    /// status to the webhook path.
    async fn set_order_status(&self, id: &str, status: OrderStatus) -> ShopResult<Order>;

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> ShopResult<Page<Order>>;

    async fn order_stats(&self, customer_id: &str) -> ShopResult<OrderStats>;

    // ---- payments --------------------------------------------------------

    /// Insert a payment; fails with `Conflict` on a duplicate intent id.
    async fn insert_payment(&self, payment: Payment) -> ShopResult<Payment>;

    async fn find_payment(&self, id: &str) -> ShopResult<Option<Payment>>;

    async fn find_payment_by_intent(&self, payment_intent_id: &str) -> ShopResult<Option<Payment>>;

    /// A customer's payments, newest first.
    async fn list_payments(&self, customer_id: &str) -> ShopResult<Vec<Payment>>;

    /// Apply a gateway outcome to the payment with this intent id and to its
    /// order in one step. Returns `None` when no payment matches.
    async fn apply_payment_outcome(
        &self,
        payment_intent_id: &str,
        outcome: PaymentOutcome,
    ) -> ShopResult<Option<(Payment, Option<Order>)>>;

    /// Append a gateway-issued refund to a payment; once nothing is left to
    /// refund the payment and its order are marked refunded. The refund is
    /// recorded even when it takes the total past the captured amount,
    /// since the gateway has already moved the money.
    async fn record_refund(&self, payment_id: &str, refund: Refund) -> ShopResult<Payment>;
}

/// Type alias for a shared store (dynamic dispatch)
pub type SharedStore = Arc<dyn Store>;
