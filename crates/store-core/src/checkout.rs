//! # Checkout
//!
//! Order placement with stock reconciliation.
//!
//! Stock for every line is reserved in one store call before the order is
//! written. If writing the order fails the reservation is handed back.

use crate::error::ShopResult;
use crate::money::Currency;
use crate::order::{Order, OrderItem, OrderRequest};
use crate::store::Store;
use crate::user::User;
use tracing::{error, info, instrument};

/// Place an order for `customer`.
#[instrument(skip(store, customer, request), fields(customer_id = %customer.id, lines = request.items.len()))]
pub async fn place_order(
    store: &dyn Store,
    customer: &User,
    request: OrderRequest,
    currency: Currency,
) -> ShopResult<Order> {
    request.validate()?;

    let products = store.reserve_stock(&request.items).await?;

    let items = request
        .items
        .iter()
        .zip(&products)
        .map(|(line, product)| OrderItem::from_product(product, line.quantity))
        .collect();

    let placed = async {
        let order = Order::new(
            customer.id.clone(),
            items,
            currency,
            request.shipping_address.clone(),
        )?;
        store.insert_order(order).await
    }
    .await;

    match placed {
        Ok(order) => {
            info!(
                order_id = %order.id,
                total = %order.total_amount.display(),
                items = order.item_count(),
                "Order placed"
            );
            Ok(order)
        }
        Err(err) => {
            error!("Failed to place order, releasing stock: {}", err);
            if let Err(release_err) = store.release_stock(&request.items).await {
                error!("Failed to release reserved stock: {}", release_err);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShopError;
    use crate::order::OrderLine;
    use crate::product::{Product, ProductDraft};
    use crate::store::MemoryStore;
    use crate::user::Role;

    async fn seed(store: &MemoryStore, name: &str, price: f64, stock: u32) -> Product {
        let product = Product::from_draft(
            ProductDraft {
                name: name.to_string(),
                description: String::new(),
                price,
                stock,
            },
            Currency::USD,
        )
        .unwrap();
        store.insert_product(product).await.unwrap()
    }

    fn request(lines: &[(&Product, u32)]) -> OrderRequest {
        OrderRequest {
            items: lines
                .iter()
                .map(|(p, q)| OrderLine {
                    product_id: p.id.clone(),
                    quantity: *q,
                })
                .collect(),
            shipping_address: Some("1 Main St".into()),
        }
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock_and_totals() {
        let store = MemoryStore::new();
        let customer = User::new("Ann", "ann@example.com", "h", Role::Customer);
        let mug = seed(&store, "Mug", 8.0, 5).await;
        let tea = seed(&store, "Tea", 4.5, 10).await;

        let order = place_order(&store, &customer, request(&[(&mug, 2), (&tea, 3)]), Currency::USD)
            .await
            .unwrap();

        assert_eq!(order.customer_id, customer.id);
        assert_eq!(order.total_amount.amount, 2 * 800 + 3 * 450);
        assert_eq!(order.items[0].name, "Mug");
        assert_eq!(store.find_product(&mug.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(store.find_product(&tea.id).await.unwrap().unwrap().stock, 7);
        assert!(store.find_order(&order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_stock_untouched() {
        let store = MemoryStore::new();
        let customer = User::new("Ann", "ann@example.com", "h", Role::Customer);
        let mug = seed(&store, "Mug", 8.0, 5).await;
        let tea = seed(&store, "Tea", 4.5, 1).await;
        let jam = seed(&store, "Jam", 3.0, 9).await;

        let err = place_order(
            &store,
            &customer,
            request(&[(&mug, 1), (&tea, 2), (&jam, 1)]),
            Currency::USD,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ShopError::InsufficientStock { .. }));
        assert_eq!(err.status_code(), 400);
        for (product, stock) in [(&mug, 5), (&tea, 1), (&jam, 9)] {
            assert_eq!(
                store.find_product(&product.id).await.unwrap().unwrap().stock,
                stock
            );
        }
        assert_eq!(store.order_stats(&customer.id).await.unwrap().total_orders, 0);
    }

    #[tokio::test]
    async fn test_overflowing_total_releases_stock() {
        let store = MemoryStore::new();
        let customer = User::new("Ann", "ann@example.com", "h", Role::Customer);
        let vault = seed(&store, "Vault", crate::product::MAX_PRICE, 100_000_000).await;

        let err = place_order(
            &store,
            &customer,
            request(&[(&vault, 100_000_000)]),
            Currency::USD,
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(
            store.find_product(&vault.id).await.unwrap().unwrap().stock,
            100_000_000
        );
        assert_eq!(store.order_stats(&customer.id).await.unwrap().total_orders, 0);
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let store = MemoryStore::new();
        let customer = User::new("Ann", "ann@example.com", "h", Role::Customer);
        let err = place_order(&store, &customer, OrderRequest::default(), Currency::USD)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
