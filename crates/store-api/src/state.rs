//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the document store, payment gateway, token signer and configuration.

use crate::auth::TokenSigner;
use crate::config::AppConfig;
use std::sync::Arc;
use store_core::{
    BoxedPaymentGateway, MemoryStore, Product, ProductCatalog, SharedStore, ShopResult,
};
use store_stripe::StripeGateway;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Document store
    pub store: SharedStore,
    /// Payment gateway
    pub gateway: BoxedPaymentGateway,
    /// Session token signer
    pub tokens: TokenSigner,
    /// Application config
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Assemble state from parts
    pub fn new(store: SharedStore, gateway: BoxedPaymentGateway, config: AppConfig) -> Self {
        let tokens = TokenSigner::new(&config.token_secret, config.token_ttl_hours);
        Self {
            store,
            gateway,
            tokens,
            config: Arc::new(config),
        }
    }

    /// Build production state: environment config, Stripe, in-memory store
    /// seeded from the product catalog
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let gateway = StripeGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        if gateway.config().is_test_mode() {
            info!("Stripe is in test mode");
        }

        let store = MemoryStore::new();
        if let Some(catalog) = load_product_catalog()? {
            let seeded = seed_catalog(&store, catalog, &config).await?;
            info!("Seeded {} products", seeded);
        }

        Ok(Self::new(Arc::new(store), Arc::new(gateway), config))
    }
}

/// Insert every catalog entry into the store.
pub async fn seed_catalog(
    store: &MemoryStore,
    catalog: ProductCatalog,
    config: &AppConfig,
) -> ShopResult<usize> {
    use store_core::Store;

    let count = catalog.len();
    for draft in catalog.products {
        store
            .insert_product(Product::from_draft(draft, config.currency)?)
            .await?;
    }
    Ok(count)
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<Option<ProductCatalog>> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", catalog.len(), path);
            return Ok(Some(catalog));
        }
    }

    warn!("No product catalog found, starting with an empty store");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_core::Store;

    #[tokio::test]
    async fn test_seed_catalog() {
        let catalog = ProductCatalog::from_toml(
            r#"
            [[products]]
            name = "Mug"
            description = "Stoneware, 350ml"
            price = 12.5
            stock = 40

            [[products]]
            name = "Poster"
            price = 20.0
            "#,
        )
        .unwrap();

        let config = AppConfig::from_lookup(|_| None).unwrap();
        let store = MemoryStore::new();
        assert_eq!(seed_catalog(&store, catalog, &config).await.unwrap(), 2);

        let products = store.list_products().await.unwrap();
        assert_eq!(products.len(), 2);
        let mug = products.iter().find(|p| p.name == "Mug").unwrap();
        assert_eq!(mug.price.amount, 1250);
        let poster = products.iter().find(|p| p.name == "Poster").unwrap();
        assert_eq!(poster.stock, 0);
    }

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = ProductCatalog::from_toml(include_str!("../../../config/products.toml")).unwrap();
        assert!(!catalog.is_empty());
    }
}
