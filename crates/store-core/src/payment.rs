//! # Payment Records
//!
//! Local record of a gateway payment intent and the refunds issued
//! against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Price;
use crate::order::PaymentStatus;

/// Why a refund was issued (gateway vocabulary)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    #[default]
    RequestedByCustomer,
    Abandoned,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::Duplicate => "duplicate",
            RefundReason::Fraudulent => "fraudulent",
            RefundReason::RequestedByCustomer => "requested_by_customer",
            RefundReason::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Succeeded,
    Failed,
}

impl RefundStatus {
    /// Map a gateway refund status string; anything unrecognized is pending
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "succeeded" => RefundStatus::Succeeded,
            "failed" | "canceled" => RefundStatus::Failed,
            _ => RefundStatus::Pending,
        }
    }
}

/// A refund issued against a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    /// Gateway refund id
    pub refund_id: String,
    pub amount: Price,
    pub reason: RefundReason,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}

/// A payment attempt for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,

    pub order_id: String,

    pub customer_id: String,

    pub amount: Price,

    /// Gateway payment intent id; unique across payments
    pub payment_intent_id: String,

    #[serde(default)]
    pub status: PaymentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub refunds: Vec<Refund>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a pending payment for a freshly created intent
    pub fn pending(
        order_id: impl Into<String>,
        customer_id: impl Into<String>,
        amount: Price,
        payment_intent_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            customer_id: customer_id.into(),
            amount,
            payment_intent_id: payment_intent_id.into(),
            status: PaymentStatus::Pending,
            failure_reason: None,
            processed_at: None,
            refunds: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_completed(&mut self) {
        let now = Utc::now();
        self.status = PaymentStatus::Completed;
        self.processed_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, reason: Option<String>) {
        self.status = PaymentStatus::Failed;
        self.failure_reason = reason;
        self.updated_at = Utc::now();
    }

    /// Sum of refunds that have not failed
    pub fn refunded_amount(&self) -> i64 {
        self.refunds
            .iter()
            .filter(|r| r.status != RefundStatus::Failed)
            .map(|r| r.amount.amount)
            .sum()
    }

    /// Amount still available for refunding
    pub fn refundable_amount(&self) -> i64 {
        (self.amount.amount - self.refunded_amount()).max(0)
    }

    /// Record a refund; returns true when the payment is now fully refunded
    pub fn record_refund(&mut self, refund: Refund) -> bool {
        self.refunds.push(refund);
        self.updated_at = Utc::now();
        let fully_refunded = self.refundable_amount() == 0;
        if fully_refunded {
            self.status = PaymentStatus::Refunded;
        }
        fully_refunded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn refund(amount: i64, status: RefundStatus) -> Refund {
        Refund {
            refund_id: format!("re_{}", amount),
            amount: Price::from_cents(amount, Currency::USD),
            reason: RefundReason::default(),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_transitions() {
        let mut payment = Payment::pending("o", "c", Price::from_cents(1000, Currency::USD), "pi_1");
        assert_eq!(payment.status, PaymentStatus::Pending);

        payment.mark_completed();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.processed_at.is_some());

        payment.mark_failed(Some("card_declined".into()));
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failure_reason.as_deref(), Some("card_declined"));
    }

    #[test]
    fn test_partial_then_full_refund() {
        let mut payment = Payment::pending("o", "c", Price::from_cents(1000, Currency::USD), "pi_1");
        payment.mark_completed();

        assert!(!payment.record_refund(refund(400, RefundStatus::Succeeded)));
        assert_eq!(payment.refundable_amount(), 600);
        assert_eq!(payment.status, PaymentStatus::Completed);

        // failed refunds do not count
        assert!(!payment.record_refund(refund(600, RefundStatus::Failed)));
        assert_eq!(payment.refundable_amount(), 600);

        assert!(payment.record_refund(refund(600, RefundStatus::Pending)));
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_refund_status_mapping() {
        assert_eq!(RefundStatus::from_gateway("succeeded"), RefundStatus::Succeeded);
        assert_eq!(RefundStatus::from_gateway("canceled"), RefundStatus::Failed);
        assert_eq!(RefundStatus::from_gateway("requires_action"), RefundStatus::Pending);
        assert_eq!(RefundReason::default(), RefundReason::RequestedByCustomer);
    }
}
