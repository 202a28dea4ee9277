//! # Request Handlers
//!
//! Axum request handlers, one module per resource.

pub mod auth;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;

use axum::{response::IntoResponse, Json};
use serde::Deserialize;
use store_core::{OrderStatus, PageRequest};

/// Paging and status filter shared by the order listings.
///
/// `page` and `limit` are parsed leniently: anything that is not a positive
/// integer falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page.as_deref(), self.limit.as_deref())
    }
}

pub(crate) fn page_request(page: Option<&str>, limit: Option<&str>) -> PageRequest {
    let parse = |value: Option<&str>| value.and_then(|v| v.trim().parse::<u64>().ok());
    PageRequest::new(parse(page), parse(limit))
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
