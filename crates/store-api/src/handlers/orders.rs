//! Order placement and lookup.

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::handlers::ListQuery;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use store_core::user::ensure_owner_or_admin;
use store_core::{checkout, customers, Order, OrderRequest, OrderStatus, Pagination, ShopError};
use tracing::{info, instrument};

/// A page of orders
#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[instrument(skip(state, user, request), fields(customer_id = %user.id))]
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<OrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order =
        checkout::place_order(state.store.as_ref(), &user, request, state.config.currency).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's own orders, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<OrderList>> {
    let page = customers::customer_orders(
        state.store.as_ref(),
        &user,
        &user.id,
        query.status,
        query.page_request(),
    )
    .await?;

    Ok(Json(OrderList {
        orders: page.items,
        pagination: page.pagination,
    }))
}

pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state
        .store
        .find_order(&id)
        .await?
        .ok_or_else(|| ShopError::not_found("Order", &id))?;
    ensure_owner_or_admin(&user, &order.customer_id)?;
    Ok(Json(order))
}

#[instrument(skip(state, admin, update), fields(admin_id = %admin.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<Json<Order>> {
    let order = state.store.set_order_status(&id, update.status).await?;

    info!(order_id = %order.id, status = ?order.status, "Order status updated");
    Ok(Json(order))
}
