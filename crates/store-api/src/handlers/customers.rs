//! Customer profiles, statistics and removal.

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::handlers::orders::OrderList;
use crate::handlers::{page_request, ListQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use store_core::customers::{self, CustomerOverview, Removal};
use store_core::{CustomerQuery, CustomerSort, Pagination, ProfileUpdate, SortOrder, User};
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default, alias = "sortBy")]
    pub sort_by: CustomerSort,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub search: Option<String>,
}

impl CustomerListQuery {
    fn into_query(self) -> CustomerQuery {
        CustomerQuery {
            page: page_request(self.page.as_deref(), self.limit.as_deref()),
            search: self.search.filter(|s| !s.trim().is_empty()),
            sort_by: self.sort_by,
            order: self.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerList {
    pub customers: Vec<User>,
    pub pagination: Pagination,
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn list_customers(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<CustomerListQuery>,
) -> ApiResult<Json<CustomerList>> {
    let page = customers::list_customers(state.store.as_ref(), &admin, &query.into_query()).await?;
    Ok(Json(CustomerList {
        customers: page.items,
        pagination: page.pagination,
    }))
}

pub async fn get_customer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<CustomerOverview>> {
    Ok(Json(
        customers::customer_overview(state.store.as_ref(), &user, &id).await?,
    ))
}

pub async fn update_customer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(
        customers::update_customer(state.store.as_ref(), &user, &id, update).await?,
    ))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let body = match customers::remove_customer(state.store.as_ref(), &admin, &id).await? {
        Removal::Deactivated => json!({
            "message": "Customer deactivated successfully",
            "note": "Customer has existing orders and was soft-deleted"
        }),
        Removal::Deleted => json!({ "message": "Customer deleted successfully" }),
    };
    Ok(Json(body))
}

pub async fn customer_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<OrderList>> {
    let page = customers::customer_orders(
        state.store.as_ref(),
        &user,
        &id,
        query.status,
        query.page_request(),
    )
    .await?;

    Ok(Json(OrderList {
        orders: page.items,
        pagination: page.pagination,
    }))
}
