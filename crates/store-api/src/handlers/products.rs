//! Product catalog CRUD.

use crate::auth::AdminUser;
use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use store_core::{Product, ProductDraft, ProductPatch, ShopError};
use tracing::{info, instrument};

async fn load(state: &AppState, id: &str) -> Result<Product, ShopError> {
    state
        .store
        .find_product(id)
        .await?
        .ok_or_else(|| ShopError::not_found("Product", id))
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.store.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(load(&state, &id).await?))
}

#[instrument(skip(state, _admin, draft))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = Product::from_draft(draft, state.config.currency)?;
    let product = state.store.insert_product(product).await?;

    info!(product_id = %product.id, price = %product.price.display(), "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, _admin, patch))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> ApiResult<Json<Product>> {
    patch.validate()?;
    Ok(Json(state.store.patch_product(&id, patch).await?))
}

#[instrument(skip(state, _admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.store.delete_product(&id).await? {
        return Err(ShopError::not_found("Product", id).into());
    }

    info!(product_id = %id, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted" })))
}
