//! # Customer Management
//!
//! Profile reads and updates, order statistics, and the soft/hard delete
//! rule: customers with order history are deactivated, customers without
//! are removed.

use crate::error::{ShopError, ShopResult};
use crate::order::{Order, OrderStats, OrderStatus};
use crate::pagination::{Page, PageRequest};
use crate::store::{CustomerQuery, OrderFilter, Store};

pub use crate::store::Removal;
use crate::user::{ensure_admin, ensure_owner_or_admin, ProfileUpdate, User};
use serde::Serialize;
use tracing::{info, instrument};

/// How many recent orders the customer overview carries
pub const RECENT_ORDER_COUNT: u64 = 5;

/// A customer with order statistics and most recent orders
#[derive(Debug, Clone, Serialize)]
pub struct CustomerOverview {
    pub customer: User,
    pub statistics: OrderStats,
    pub recent_orders: Vec<Order>,
}

async fn load(store: &dyn Store, id: &str) -> ShopResult<User> {
    store
        .find_user(id)
        .await?
        .ok_or_else(|| ShopError::not_found("Customer", id))
}

/// Admin listing of customers.
pub async fn list_customers(
    store: &dyn Store,
    caller: &User,
    query: &CustomerQuery,
) -> ShopResult<Page<User>> {
    ensure_admin(caller)?;
    store.list_customers(query).await
}

#[instrument(skip(store, caller), fields(caller_id = %caller.id))]
pub async fn customer_overview(
    store: &dyn Store,
    caller: &User,
    id: &str,
) -> ShopResult<CustomerOverview> {
    ensure_owner_or_admin(caller, id)?;
    let customer = load(store, id).await?;

    let statistics = store.order_stats(&customer.id).await?;
    let recent = store
        .list_orders(
            &OrderFilter {
                customer_id: Some(customer.id.clone()),
                status: None,
            },
            PageRequest::new(Some(1), Some(RECENT_ORDER_COUNT)),
        )
        .await?;

    Ok(CustomerOverview {
        customer,
        statistics,
        recent_orders: recent.items,
    })
}

#[instrument(skip(store, caller, update), fields(caller_id = %caller.id))]
pub async fn update_customer(
    store: &dyn Store,
    caller: &User,
    id: &str,
    update: ProfileUpdate,
) -> ShopResult<User> {
    ensure_owner_or_admin(caller, id)?;
    update.validate()?;
    // the store rejects an email that belongs to someone else
    store.update_profile(id, update).await
}

#[instrument(skip(store, caller), fields(caller_id = %caller.id))]
pub async fn remove_customer(store: &dyn Store, caller: &User, id: &str) -> ShopResult<Removal> {
    ensure_admin(caller)?;

    let removal = store.remove_customer(id).await?;
    match removal {
        Removal::Deactivated => info!(customer_id = id, "Customer soft-deleted"),
        Removal::Deleted => info!(customer_id = id, "Customer deleted"),
    }
    Ok(removal)
}

/// One page of a customer's orders, optionally filtered by status.
pub async fn customer_orders(
    store: &dyn Store,
    caller: &User,
    id: &str,
    status: Option<OrderStatus>,
    page: PageRequest,
) -> ShopResult<Page<Order>> {
    ensure_owner_or_admin(caller, id)?;
    store
        .list_orders(
            &OrderFilter {
                customer_id: Some(id.to_string()),
                status,
            },
            page,
        )
        .await
}
