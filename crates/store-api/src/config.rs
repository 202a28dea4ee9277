//! # Application Configuration
//!
//! Server, auth and store settings loaded from the environment.
//! Stripe keys are read separately by `store_stripe::StripeConfig`.

use std::net::SocketAddr;
use store_core::{Currency, ShopError};

const DEV_TOKEN_SECRET: &str = "storefront-dev-token-secret";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// HMAC key for session tokens
    pub token_secret: String,
    /// Session token lifetime in hours
    pub token_ttl_hours: i64,
    /// Bootstrap key for creating admins; admin creation is off when unset
    pub admin_key: Option<String>,
    /// Currency for prices and payments
    pub currency: Currency,
}

impl AppConfig {
    /// Load from environment variables (and `.env` when present)
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ShopError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ShopError::Configuration(format!("Invalid PORT: {}", port)))?,
            None => 3000,
        };

        let token_secret = match var("AUTH_TOKEN_SECRET") {
            Some(secret) => secret,
            None if environment == "production" => {
                return Err(ShopError::Configuration(
                    "AUTH_TOKEN_SECRET not set".to_string(),
                ))
            }
            None => DEV_TOKEN_SECRET.to_string(),
        };

        let token_ttl_hours = match var("AUTH_TOKEN_TTL_HOURS") {
            Some(hours) => hours
                .parse()
                .ok()
                .filter(|h: &i64| *h > 0)
                .ok_or_else(|| {
                    ShopError::Configuration(format!("Invalid AUTH_TOKEN_TTL_HOURS: {}", hours))
                })?,
            None => 24,
        };

        let currency = match var("CURRENCY") {
            Some(code) => Currency::parse(&code)
                .ok_or_else(|| ShopError::Configuration(format!("Unsupported CURRENCY: {}", code)))?,
            None => Currency::USD,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            environment,
            token_secret,
            token_ttl_hours,
            admin_key: var("ADMIN_KEY"),
            currency,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ShopError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ShopError::Configuration(format!("Invalid socket address: {}", e)))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.currency, Currency::USD);
        assert!(config.admin_key.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_requires_token_secret() {
        let err = AppConfig::from_lookup(lookup(&[("ENVIRONMENT", "production")])).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: AUTH_TOKEN_SECRET not set");

        let config = AppConfig::from_lookup(lookup(&[
            ("ENVIRONMENT", "production"),
            ("AUTH_TOKEN_SECRET", "s3cret"),
            ("CURRENCY", "EUR"),
            ("ADMIN_KEY", "boot"),
        ]))
        .unwrap();
        assert!(config.is_production());
        assert_eq!(config.currency, Currency::EUR);
        assert_eq!(config.admin_key.as_deref(), Some("boot"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("AUTH_TOKEN_TTL_HOURS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("CURRENCY", "doge")])).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig::from_lookup(lookup(&[("HOST", "0.0.0.0"), ("PORT", "8080")])).unwrap();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8080");
    }
}
