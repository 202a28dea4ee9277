//! # Authentication
//!
//! Argon2 password hashing, HMAC-signed session tokens and the request
//! extractors that resolve a bearer token to a `User`.
//!
//! A token is `<user id>.<expiry unix seconds>.<hex hmac-sha256>`, signed
//! over `"<user id>.<expiry>"`. Tokens are stateless; the user is reloaded
//! on every request so role changes and deactivation apply immediately.

use crate::error::ApiError;
use crate::state::AppState;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use store_core::{ShopError, ShopResult, User};
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Hash a password with Argon2id and a random salt.
pub async fn hash_password(password: String) -> ShopResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ShopError::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| ShopError::Internal(format!("Hashing task failed: {}", e)))?
}

/// Check a password against a stored PHC string.
pub async fn verify_password(password: String, hash: String) -> ShopResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ShopError::Internal(format!("Stored password hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ShopError::Internal(format!("Verification task failed: {}", e)))?
}

/// Why a token was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Token expired")]
    Expired,
}

impl From<TokenError> for ShopError {
    fn from(err: TokenError) -> Self {
        ShopError::Unauthorized(err.to_string())
    }
}

/// Issues and checks session tokens
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    fn sign(&self, message: &str) -> ShopResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ShopError::Internal(format!("HMAC key rejected: {}", e)))?;
        mac.update(message.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Issue a token for `user_id` valid from `now`.
    pub fn issue_at(&self, user_id: &str, now: DateTime<Utc>) -> ShopResult<String> {
        let message = format!("{}.{}", user_id, (now + self.ttl).timestamp());
        let signature = hex::encode(self.sign(&message)?);
        Ok(format!("{}.{}", message, signature))
    }

    pub fn issue(&self, user_id: &str) -> ShopResult<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Check a token at `now` and return the user id it names.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let (message, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (user_id, expiry) = message.rsplit_once('.').ok_or(TokenError::Malformed)?;
        if user_id.is_empty() {
            return Err(TokenError::Malformed);
        }
        let expiry: i64 = expiry.parse().map_err(|_| TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::BadSignature)?;
        mac.update(message.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        if now.timestamp() >= expiry {
            return Err(TokenError::Expired);
        }

        Ok(user_id.to_string())
    }

    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now())
    }
}

fn bearer_token(parts: &Parts) -> ShopResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ShopError::Unauthorized("No token, authorization denied".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ShopError::Unauthorized("No token, authorization denied".to_string()))
}

/// Resolve the request's bearer token to an active user.
async fn authenticate(parts: &Parts, state: &AppState) -> ShopResult<User> {
    let token = bearer_token(parts)?;
    let user_id = state.tokens.verify(token)?;

    let user = state
        .store
        .find_user(&user_id)
        .await?
        .ok_or_else(|| ShopError::Unauthorized("Token is not valid".to_string()))?;

    if !user.is_active() {
        debug!(user_id = %user.id, "Rejected token for inactive account");
        return Err(ShopError::AccountInactive);
    }

    Ok(user)
}

/// Extractor for any signed-in, active user.
///
/// ```rust,ignore
/// async fn handler(AuthUser(user): AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).await?))
    }
}

/// Extractor that additionally requires the admin role.
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        store_core::user::ensure_admin(&user)?;
        Ok(Self(user))
    }
}
