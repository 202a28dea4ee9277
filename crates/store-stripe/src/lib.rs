//! # store-stripe
//!
//! Stripe payment gateway for storefront-rs.
//!
//! - **StripeGateway** creates payment intents, issues refunds and lists
//!   saved cards through the Stripe REST API
//! - **webhook** verifies `Stripe-Signature` headers and turns
//!   `payment_intent.*` events into `GatewayEvent`s
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use store_core::{billing, BoxedPaymentGateway};
//! use store_stripe::StripeGateway;
//!
//! let gateway: BoxedPaymentGateway = Arc::new(StripeGateway::from_env()?);
//! let started = billing::start_payment(&store, gateway.as_ref(), &customer, &order_id).await?;
//! // return started.intent.client_secret to the browser
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! let event = gateway.verify_webhook(&body, signature).await?;
//! billing::reconcile_event(&store, &event).await?;
//! ```

pub mod config;
pub mod gateway;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use gateway::StripeGateway;
pub use webhook::{construct_event, signature_header, REQUIRED_WEBHOOK_EVENTS};
