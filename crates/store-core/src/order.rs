//! # Order Types
//!
//! Orders, their line items and payment state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ShopError, ShopResult};
use crate::money::{Currency, Price};
use crate::product::Product;

fn total_too_large() -> ShopError {
    ShopError::InvalidRequest("Order total is too large".to_string())
}

/// A line item in an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product ID
    pub product_id: String,

    /// Product name at the time of purchase (denormalized for display)
    pub name: String,

    /// Unit price at the time of purchase
    pub unit_price: Price,

    pub quantity: u32,
}

impl OrderItem {
    /// Create a line item from a product snapshot
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }
    }

    /// Total for this line; fails when the amount does not fit
    pub fn total(&self) -> ShopResult<Price> {
        self.unit_price
            .checked_times(self.quantity)
            .ok_or_else(total_too_large)
    }
}

/// Fulfillment status of an order
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Payment status, shared by orders and payment records
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// A placed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,

    /// Owning customer
    pub customer_id: String,

    pub items: Vec<OrderItem>,

    pub total_amount: Price,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(default)]
    pub payment_status: PaymentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order; the total is derived from the items
    pub fn new(
        customer_id: impl Into<String>,
        items: Vec<OrderItem>,
        currency: Currency,
        shipping_address: Option<String>,
    ) -> ShopResult<Self> {
        let mut total = Price::zero(currency);
        for item in &items {
            total = total.checked_add(item.total()?).ok_or_else(total_too_large)?;
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.into(),
            items,
            total_amount: total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get item count
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.updated_at = Utc::now();
    }
}

/// One requested line in a checkout request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Checkout request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_address: Option<String>,
}

impl OrderRequest {
    pub fn validate(&self) -> ShopResult<()> {
        if self.items.is_empty() {
            return Err(ShopError::InvalidRequest(
                "Order must contain at least one item".to_string(),
            ));
        }
        if let Some(line) = self.items.iter().find(|line| line.quantity == 0) {
            return Err(ShopError::InvalidRequest(format!(
                "Quantity for product {} must be at least 1",
                line.product_id
            )));
        }
        Ok(())
    }
}

/// Aggregated order figures for one customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    /// Sum of order totals, smallest currency unit
    pub total_spent: i64,
    /// Mean order total, smallest currency unit
    pub average_order_value: f64,
}

impl OrderStats {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let (count, spent) = orders
            .into_iter()
            .fold((0u64, 0i64), |(count, spent), order| {
                (count + 1, spent.saturating_add(order.total_amount.amount))
            });
        Self {
            total_orders: count,
            total_spent: spent,
            average_order_value: if count == 0 {
                0.0
            } else {
                spent as f64 / count as f64
            },
        }
    }
}
