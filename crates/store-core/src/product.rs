//! # Product Types
//!
//! Product catalog types. The startup catalog can be seeded from
//! `config/products.toml`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ShopError, ShopResult};
use crate::money::{Currency, Price};
use crate::validate;

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Unit price
    pub price: Price,

    /// Units available for sale
    pub stock: u32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a product from a validated draft
    pub fn from_draft(draft: ProductDraft, currency: Currency) -> ShopResult<Self> {
        draft.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            price: Price::new(draft.price, currency),
            stock: draft.stock,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update
    pub fn apply(&mut self, patch: ProductPatch) -> ShopResult<()> {
        patch.validate()?;
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = Price::new(price, self.price.currency);
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn in_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

/// Request body for creating a product; `price` is a decimal amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
}

impl ProductDraft {
    pub fn validate(&self) -> ShopResult<()> {
        validate::require_non_empty("name", &self.name)?;
        validate_price(self.price)
    }
}

/// Request body for updating a product
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<u32>,
}

impl ProductPatch {
    pub fn validate(&self) -> ShopResult<()> {
        if let Some(name) = &self.name {
            validate::require_non_empty("name", name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

/// Largest accepted unit price, in the currency's major unit
pub const MAX_PRICE: f64 = 1_000_000_000.0;

fn validate_price(price: f64) -> ShopResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(ShopError::InvalidRequest(
            "price must be a non-negative number".to_string(),
        ));
    }
    if price > MAX_PRICE {
        return Err(ShopError::InvalidRequest(format!(
            "price must not exceed {}",
            MAX_PRICE
        )));
    }
    Ok(())
}

/// Seed catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<ProductDraft>,
}

impl ProductCatalog {
    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
