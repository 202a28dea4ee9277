//! Registration, login and admin bootstrap.

use crate::auth::{hash_password, verify_password, AdminUser};
use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use store_core::{validate, Role, ShopError, User};
use tracing::{info, instrument, warn};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), ShopError> {
        validate::email(&self.email)?;
        validate::password(&self.password)?;
        validate::require_non_empty("Name", &self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    #[serde(flatten)]
    pub account: RegisterRequest,
    #[serde(default, alias = "adminKey")]
    pub admin_key: String,
}

/// Token plus the signed-in user
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

fn invalid_credentials() -> ShopError {
    ShopError::Unauthorized("Invalid credentials".to_string())
}

async fn create_account(state: &AppState, request: RegisterRequest, role: Role) -> ApiResult<AuthResponse> {
    request.validate()?;

    if state.store.find_user_by_email(&request.email).await?.is_some() {
        return Err(ShopError::Conflict("Email already in use".to_string()).into());
    }

    let password_hash = hash_password(request.password).await?;
    // the store re-checks the email under its write lock
    let user = state
        .store
        .insert_user(User::new(request.name.trim(), request.email, password_hash, role))
        .await?;
    let token = state.tokens.issue(&user.id)?;

    info!(user_id = %user.id, role = ?user.role, "Account created");
    Ok(AuthResponse { token, user })
}

#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = create_account(&state, request, Role::Customer).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    validate::email(&request.email)?;
    validate::require_non_empty("Password", &request.password)?;

    let user = state
        .store
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(request.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Failed login");
        return Err(invalid_credentials().into());
    }
    if !user.is_active() {
        return Err(ShopError::AccountInactive.into());
    }

    let token = state.tokens.issue(&user.id)?;
    Ok(Json(AuthResponse { token, user }))
}

#[instrument(skip(state, request))]
pub async fn create_admin(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateAdminRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let expected = state.config.admin_key.as_deref().ok_or_else(|| {
        warn!("Admin creation attempted but ADMIN_KEY is not configured");
        ShopError::AccessDenied
    })?;
    if request.admin_key != expected {
        warn!("Admin creation attempted with a wrong key");
        return Err(ShopError::AccessDenied.into());
    }

    let response = create_account(&state, request.account, Role::Admin).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn promote(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state.store.promote_user(&id).await?;

    info!(user_id = %user.id, "User promoted to admin");
    Ok(Json(user))
}
