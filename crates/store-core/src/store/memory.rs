//! In-process document store.
//!
//! All collections sit behind one `RwLock`; every trait method takes the
//! lock once, so each method is atomic with respect to the others.

use super::{CustomerQuery, CustomerSort, OrderFilter, PaymentOutcome, Removal, SortOrder, Store};
use crate::error::{ShopError, ShopResult};
use crate::order::{Order, OrderLine, OrderStats, OrderStatus, PaymentStatus};
use crate::pagination::{Page, PageRequest, Pagination};
use crate::payment::{Payment, Refund, RefundStatus};
use crate::product::{Product, ProductPatch};
use crate::user::{ProfileUpdate, Role, User};
use crate::validate::normalize_email;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<String, User>,
    products: HashMap<String, Product>,
    orders: HashMap<String, Order>,
    payments: HashMap<String, Payment>,
}

impl Collections {
    fn email_taken(&self, email: &str, except_id: Option<&str>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id.as_str()) != except_id)
    }
}

/// `Store` backed by in-memory hash maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_in_use() -> ShopError {
    ShopError::Conflict("Email already in use".to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> ShopResult<User> {
        let mut data = self.inner.write().await;
        if data.email_taken(&user.email, None) {
            return Err(email_in_use());
        }
        data.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &str) -> ShopResult<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let data = self.inner.read().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> ShopResult<User> {
        let mut data = self.inner.write().await;
        if let Some(email) = update.email.as_deref() {
            if data.email_taken(&normalize_email(email), Some(id)) {
                return Err(email_in_use());
            }
        }
        let user = data
            .users
            .get_mut(id)
            .ok_or_else(|| ShopError::not_found("Customer", id))?;
        user.apply(update);
        Ok(user.clone())
    }

    async fn promote_user(&self, id: &str) -> ShopResult<User> {
        let mut data = self.inner.write().await;
        let user = data
            .users
            .get_mut(id)
            .ok_or_else(|| ShopError::not_found("User", id))?;
        user.promote();
        Ok(user.clone())
    }

    async fn set_gateway_customer(&self, id: &str, gateway_customer_id: &str) -> ShopResult<User> {
        let mut data = self.inner.write().await;
        let user = data
            .users
            .get_mut(id)
            .ok_or_else(|| ShopError::not_found("User", id))?;
        user.stripe_customer_id = Some(gateway_customer_id.to_string());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn remove_customer(&self, id: &str) -> ShopResult<Removal> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;

        let has_orders = data.orders.values().any(|o| o.customer_id == id);
        let user = data
            .users
            .get_mut(id)
            .ok_or_else(|| ShopError::not_found("Customer", id))?;

        if has_orders {
            user.deactivate();
            return Ok(Removal::Deactivated);
        }
        data.users.remove(id);
        Ok(Removal::Deleted)
    }

    async fn list_customers(&self, query: &CustomerQuery) -> ShopResult<Page<User>> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let data = self.inner.read().await;
        let mut customers: Vec<User> = data
            .users
            .values()
            .filter(|u| u.role == Role::Customer)
            .filter(|u| match &needle {
                Some(n) => u.name.to_lowercase().contains(n) || u.email.contains(n),
                None => true,
            })
            .cloned()
            .collect();
        drop(data);

        customers.sort_by(|a, b| {
            let ord = match query.sort_by {
                CustomerSort::CreatedAt => a.created_at.cmp(&b.created_at),
                CustomerSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                CustomerSort::Email => a.email.cmp(&b.email),
            }
            .then_with(|| a.id.cmp(&b.id));
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = customers.len() as u64;
        Ok(Page {
            items: query.page.slice(customers),
            pagination: Pagination::new(query.page, total),
        })
    }

    async fn insert_product(&self, product: Product) -> ShopResult<Product> {
        let mut data = self.inner.write().await;
        data.products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn find_product(&self, id: &str) -> ShopResult<Option<Product>> {
        Ok(self.inner.read().await.products.get(id).cloned())
    }

    async fn list_products(&self) -> ShopResult<Vec<Product>> {
        let data = self.inner.read().await;
        let mut products: Vec<Product> = data.products.values().cloned().collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn patch_product(&self, id: &str, patch: ProductPatch) -> ShopResult<Product> {
        let mut data = self.inner.write().await;
        let product = data
            .products
            .get_mut(id)
            .ok_or_else(|| ShopError::not_found("Product", id))?;
        product.apply(patch)?;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: &str) -> ShopResult<bool> {
        Ok(self.inner.write().await.products.remove(id).is_some())
    }

    async fn reserve_stock(&self, lines: &[OrderLine]) -> ShopResult<Vec<Product>> {
        // Lines naming the same product draw from the same stock.
        let mut requested: HashMap<&str, u32> = HashMap::new();
        for line in lines {
            let total = requested.entry(line.product_id.as_str()).or_insert(0);
            *total = total.saturating_add(line.quantity);
        }

        let mut data = self.inner.write().await;

        // Check everything before touching anything.
        for line in lines {
            let product = data
                .products
                .get(&line.product_id)
                .ok_or_else(|| ShopError::not_found("Product", &line.product_id))?;
            let wanted = requested
                .get(line.product_id.as_str())
                .copied()
                .unwrap_or(line.quantity);
            if !product.in_stock(wanted) {
                return Err(ShopError::InsufficientStock {
                    product: product.name.clone(),
                    requested: wanted,
                    available: product.stock,
                });
            }
        }

        let now = Utc::now();
        for (product_id, quantity) in &requested {
            if let Some(product) = data.products.get_mut(*product_id) {
                product.stock -= quantity;
                product.updated_at = now;
                debug!(product_id, remaining = product.stock, "Reserved stock");
            }
        }

        lines
            .iter()
            .map(|line| {
                data.products
                    .get(&line.product_id)
                    .cloned()
                    .ok_or_else(|| ShopError::not_found("Product", &line.product_id))
            })
            .collect()
    }

    async fn release_stock(&self, lines: &[OrderLine]) -> ShopResult<()> {
        let mut data = self.inner.write().await;
        let now = Utc::now();
        for line in lines {
            // A product deleted in the meantime has nothing to give back to.
            if let Some(product) = data.products.get_mut(&line.product_id) {
                product.stock = product.stock.saturating_add(line.quantity);
                product.updated_at = now;
            }
        }
        Ok(())
    }

    async fn insert_order(&self, order: Order) -> ShopResult<Order> {
        let mut data = self.inner.write().await;
        data.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: &str) -> ShopResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }

    async fn set_order_status(&self, id: &str, status: OrderStatus) -> ShopResult<Order> {
        let mut data = self.inner.write().await;
        match data.orders.get_mut(id) {
            Some(order) => {
                order.set_status(status);
                Ok(order.clone())
            }
            None => Err(ShopError::not_found("Order", id)),
        }
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> ShopResult<Page<Order>> {
        let data = self.inner.read().await;
        let mut orders: Vec<Order> = data
            .orders
            .values()
            .filter(|o| {
                filter
                    .customer_id
                    .as_deref()
                    .map_or(true, |c| o.customer_id == c)
            })
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        drop(data);

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = orders.len() as u64;
        Ok(Page {
            items: page.slice(orders),
            pagination: Pagination::new(page, total),
        })
    }

    async fn order_stats(&self, customer_id: &str) -> ShopResult<OrderStats> {
        let data = self.inner.read().await;
        Ok(OrderStats::from_orders(
            data.orders.values().filter(|o| o.customer_id == customer_id),
        ))
    }

    async fn insert_payment(&self, payment: Payment) -> ShopResult<Payment> {
        let mut data = self.inner.write().await;
        if data
            .payments
            .values()
            .any(|p| p.payment_intent_id == payment.payment_intent_id)
        {
            return Err(ShopError::Conflict(format!(
                "Payment for intent {} already exists",
                payment.payment_intent_id
            )));
        }
        data.payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn find_payment(&self, id: &str) -> ShopResult<Option<Payment>> {
        Ok(self.inner.read().await.payments.get(id).cloned())
    }

    async fn find_payment_by_intent(&self, payment_intent_id: &str) -> ShopResult<Option<Payment>> {
        let data = self.inner.read().await;
        Ok(data
            .payments
            .values()
            .find(|p| p.payment_intent_id == payment_intent_id)
            .cloned())
    }

    async fn list_payments(&self, customer_id: &str) -> ShopResult<Vec<Payment>> {
        let data = self.inner.read().await;
        let mut payments: Vec<Payment> = data
            .payments
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(payments)
    }

    async fn apply_payment_outcome(
        &self,
        payment_intent_id: &str,
        outcome: PaymentOutcome,
    ) -> ShopResult<Option<(Payment, Option<Order>)>> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;

        let Some(payment) = data
            .payments
            .values_mut()
            .find(|p| p.payment_intent_id == payment_intent_id)
        else {
            return Ok(None);
        };

        let order = data.orders.get_mut(&payment.order_id);
        match outcome {
            PaymentOutcome::Succeeded => {
                payment.mark_completed();
                if let Some(order) = order {
                    order.payment_status = PaymentStatus::Completed;
                    order.set_status(OrderStatus::Processing);
                }
            }
            PaymentOutcome::Failed { reason } => {
                payment.mark_failed(reason);
                if let Some(order) = order {
                    order.set_payment_status(PaymentStatus::Failed);
                }
            }
        }

        let order = data.orders.get(&payment.order_id).cloned();
        Ok(Some((payment.clone(), order)))
    }

    async fn record_refund(&self, payment_id: &str, refund: Refund) -> ShopResult<Payment> {
        let mut guard = self.inner.write().await;
        let data = &mut *guard;

        let payment = data
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| ShopError::not_found("Payment", payment_id))?;

        if refund.status != RefundStatus::Failed
            && refund.amount.amount > payment.refundable_amount()
        {
            error!(
                payment_id,
                refund_id = %refund.refund_id,
                amount = refund.amount.amount,
                refundable = payment.refundable_amount(),
                "Gateway refund exceeds the local refundable balance"
            );
        }

        if payment.record_refund(refund) {
            if let Some(order) = data.orders.get_mut(&payment.order_id) {
                order.set_payment_status(PaymentStatus::Refunded);
            }
        }
        Ok(payment.clone())
    }
}
