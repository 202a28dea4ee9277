//! # Shop Error Types
//!
//! Typed error handling for the storefront.
//! Every store, gateway and service operation returns `Result<T, ShopError>`.

use thiserror::Error;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed to touch the resource
    #[error("Access denied")]
    AccessDenied,

    /// Account has been deactivated
    #[error("Account is inactive")]
    AccountInactive,

    /// Entity not found
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// Requested quantity exceeds available stock
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    /// Unique constraint violated (email, payment intent id)
    #[error("{0}")]
    Conflict(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Shorthand for a missing entity
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ShopError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::NetworkError(_) | ShopError::ProviderError { .. }
        )
    }

    /// Returns true for failures the client did not cause
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::Unauthorized(_) => 401,
            ShopError::AccessDenied => 403,
            ShopError::AccountInactive => 403,
            ShopError::NotFound { .. } => 404,
            ShopError::InsufficientStock { .. } => 400,
            ShopError::Conflict(_) => 400,
            ShopError::ProviderError { .. } => 502,
            ShopError::NetworkError(_) => 503,
            ShopError::WebhookVerificationFailed(_) => 400,
            ShopError::WebhookParseError(_) => 400,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ShopError::NetworkError("timeout".into()).is_retryable());
        assert!(ShopError::ProviderError {
            provider: "stripe".into(),
            message: "api down".into()
        }
        .is_retryable());
        assert!(!ShopError::InvalidRequest("bad data".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(ShopError::AccessDenied.status_code(), 403);
        assert_eq!(ShopError::not_found("Order", "o1").status_code(), 404);
        assert_eq!(
            ShopError::InsufficientStock {
                product: "Widget".into(),
                requested: 3,
                available: 1
            }
            .status_code(),
            400
        );
        assert!(ShopError::Internal("boom".into()).is_server_error());
    }

    #[test]
    fn test_messages() {
        assert_eq!(ShopError::AccessDenied.to_string(), "Access denied");
        assert_eq!(
            ShopError::not_found("Customer", "c1").to_string(),
            "Customer not found"
        );
    }
}
