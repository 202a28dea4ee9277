//! # Billing
//!
//! Payment intents, refunds, transaction history and webhook
//! reconciliation.
//!
//! ```text
//!  create_payment_intent ──► Payment { pending }
//!                                 │
//!        payment_intent.succeeded │ payment_intent.payment_failed
//!              ┌──────────────────┴──────────────────┐
//!              ▼                                     ▼
//!  Payment { completed }                   Payment { failed }
//!  Order { processing, paid: completed }   Order { paid: failed }
//!              │
//!              │ refunds covering the full amount
//!              ▼
//!  Payment { refunded }, Order { paid: refunded }
//! ```
//!
//! Webhook transitions are flat assignments, so a replayed delivery leaves
//! the records as they were after the first one.

use crate::error::{ShopError, ShopResult};
use crate::gateway::{
    GatewayEvent, GatewayEventKind, GatewayRefund, IntentRequest, PaymentGateway, PaymentIntent,
    PaymentMethod, RefundRequest,
};
use crate::money::Price;
use crate::order::{Order, PaymentStatus};
use crate::payment::{Payment, Refund, RefundReason, RefundStatus};
use crate::store::{PaymentOutcome, Store};
use crate::user::{ensure_owner_or_admin, User};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A freshly started payment
#[derive(Debug, Clone)]
pub struct StartedPayment {
    pub payment: Payment,
    pub intent: PaymentIntent,
}

/// Create a gateway intent for an order and record a pending payment.
#[instrument(skip(store, gateway, caller), fields(caller_id = %caller.id))]
pub async fn start_payment(
    store: &dyn Store,
    gateway: &dyn PaymentGateway,
    caller: &User,
    order_id: &str,
) -> ShopResult<StartedPayment> {
    let order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| ShopError::not_found("Order", order_id))?;
    ensure_owner_or_admin(caller, &order.customer_id)?;

    if matches!(
        order.payment_status,
        PaymentStatus::Completed | PaymentStatus::Refunded
    ) {
        return Err(ShopError::InvalidRequest(
            "Order has already been paid".to_string(),
        ));
    }
    if order.total_amount.amount <= 0 {
        return Err(ShopError::InvalidRequest(
            "Order total must be greater than zero".to_string(),
        ));
    }

    let intent = gateway
        .create_payment_intent(&IntentRequest {
            order_id: order.id.clone(),
            customer_id: order.customer_id.clone(),
            amount: order.total_amount,
            idempotency_key: Uuid::new_v4().to_string(),
        })
        .await?;

    let payment = store
        .insert_payment(Payment::pending(
            order.id.clone(),
            order.customer_id.clone(),
            order.total_amount,
            intent.id.clone(),
        ))
        .await?;

    info!(
        payment_id = %payment.id,
        payment_intent_id = %intent.id,
        amount = %payment.amount.display(),
        "Payment intent created"
    );

    Ok(StartedPayment { payment, intent })
}

/// What a webhook delivery did to local records
#[derive(Debug, Clone)]
pub enum Reconciliation {
    /// Payment (and order, when present) moved to a new state
    Applied {
        payment: Payment,
        order: Option<Order>,
    },
    /// The intent id matched no local payment
    UnknownIntent(String),
    /// Event type the storefront does not act on
    Ignored,
}

/// Apply a verified gateway event to the matching payment and its order.
#[instrument(skip(store, event), fields(event_id = %event.event_id))]
pub async fn reconcile_event(store: &dyn Store, event: &GatewayEvent) -> ShopResult<Reconciliation> {
    let outcome = match &event.kind {
        GatewayEventKind::PaymentSucceeded => PaymentOutcome::Succeeded,
        GatewayEventKind::PaymentFailed => PaymentOutcome::Failed {
            reason: event.failure_message.clone(),
        },
        GatewayEventKind::Other(kind) => {
            debug!("Ignoring webhook event type {}", kind);
            return Ok(Reconciliation::Ignored);
        }
    };

    let intent_id = event.payment_intent_id.as_deref().ok_or_else(|| {
        ShopError::WebhookParseError("Event has no payment intent id".to_string())
    })?;

    match store.apply_payment_outcome(intent_id, outcome).await? {
        Some((payment, order)) => {
            info!(
                payment_id = %payment.id,
                status = ?payment.status,
                order_status = ?order.as_ref().map(|o| o.status),
                "Reconciled payment"
            );
            Ok(Reconciliation::Applied { payment, order })
        }
        None => {
            warn!("Webhook for unknown payment intent {}", intent_id);
            Ok(Reconciliation::UnknownIntent(intent_id.to_string()))
        }
    }
}

/// A refund recorded locally together with the gateway's view of it
#[derive(Debug, Clone)]
pub struct IssuedRefund {
    pub payment: Payment,
    pub refund: GatewayRefund,
}

/// Refund all or part of a completed payment.
///
/// `amount` is a decimal amount in the payment's currency; `None` refunds
/// whatever has not been refunded yet.
#[instrument(skip(store, gateway, caller), fields(caller_id = %caller.id))]
pub async fn refund_payment(
    store: &dyn Store,
    gateway: &dyn PaymentGateway,
    caller: &User,
    payment_id: &str,
    amount: Option<f64>,
    reason: Option<RefundReason>,
) -> ShopResult<IssuedRefund> {
    let payment = store
        .find_payment(payment_id)
        .await?
        .ok_or_else(|| ShopError::not_found("Payment", payment_id))?;
    ensure_owner_or_admin(caller, &payment.customer_id)?;

    if payment.status != PaymentStatus::Completed {
        return Err(ShopError::InvalidRequest(
            "Only completed payments can be refunded".to_string(),
        ));
    }

    let currency = payment.amount.currency;
    let refundable = payment.refundable_amount();
    let requested = match amount {
        Some(value) => {
            if !value.is_finite() || value <= 0.0 {
                return Err(ShopError::InvalidRequest(
                    "Refund amount must be greater than zero".to_string(),
                ));
            }
            let cents = currency.to_smallest_unit(value);
            if cents <= 0 {
                return Err(ShopError::InvalidRequest(
                    "Refund amount must be greater than zero".to_string(),
                ));
            }
            if cents > refundable {
                return Err(ShopError::InvalidRequest(format!(
                    "Refund amount exceeds refundable balance of {}",
                    Price::from_cents(refundable, currency).display()
                )));
            }
            Some(Price::from_cents(cents, currency))
        }
        None => None,
    };
    let reason = reason.unwrap_or_default();

    let refund = gateway
        .create_refund(&RefundRequest {
            payment_intent_id: payment.payment_intent_id.clone(),
            amount: requested,
            reason,
        })
        .await?;

    // the gateway's figure is what actually left the account
    let issued = if refund.amount > 0 {
        Price::from_cents(refund.amount, currency)
    } else {
        requested.unwrap_or(Price::from_cents(refundable, currency))
    };
    let recorded = Refund {
        refund_id: refund.id.clone(),
        amount: issued,
        reason,
        status: RefundStatus::from_gateway(&refund.status),
        created_at: Utc::now(),
    };
    let payment = store.record_refund(&payment.id, recorded).await?;

    info!(
        payment_id = %payment.id,
        refund_id = %refund.id,
        status = ?payment.status,
        "Refund recorded"
    );

    Ok(IssuedRefund { payment, refund })
}

/// Saved cards for the caller; callers without a gateway customer have none.
pub async fn payment_methods(
    gateway: &dyn PaymentGateway,
    caller: &User,
) -> ShopResult<Vec<PaymentMethod>> {
    match caller.stripe_customer_id.as_deref() {
        Some(customer) => gateway.list_payment_methods(customer).await,
        None => Ok(Vec::new()),
    }
}

/// A payment with its order embedded
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    #[serde(flatten)]
    pub payment: Payment,
    pub order: Option<Order>,
}

/// The caller's payments, newest first.
pub async fn transaction_history(store: &dyn Store, caller: &User) -> ShopResult<Vec<Transaction>> {
    let payments = store.list_payments(&caller.id).await?;
    let mut transactions = Vec::with_capacity(payments.len());
    for payment in payments {
        let order = store.find_order(&payment.order_id).await?;
        transactions.push(Transaction { payment, order });
    }
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use crate::order::{OrderItem, OrderStatus};
    use crate::product::{Product, ProductDraft};
    use crate::store::MemoryStore;
    use crate::user::Role;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Numbered intents; refunds draw down a per-intent balance
    #[derive(Default)]
    struct FakeGateway {
        intents: AtomicUsize,
        balances: Mutex<HashMap<String, i64>>,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_payment_intent(&self, request: &IntentRequest) -> ShopResult<PaymentIntent> {
            let n = self.intents.fetch_add(1, Ordering::SeqCst);
            self.balances
                .lock()
                .unwrap()
                .insert(format!("pi_{}", n), request.amount.amount);
            Ok(PaymentIntent {
                id: format!("pi_{}", n),
                client_secret: format!("pi_{}_secret_{}", n, request.order_id),
                status: "requires_payment_method".into(),
            })
        }

        async fn create_refund(&self, request: &RefundRequest) -> ShopResult<GatewayRefund> {
            let mut balances = self.balances.lock().unwrap();
            let balance = balances.entry(request.payment_intent_id.clone()).or_default();
            let amount = request.amount.map(|p| p.amount).unwrap_or(*balance);
            *balance -= amount;
            Ok(GatewayRefund {
                id: format!("re_{}_{}", request.payment_intent_id, *balance),
                status: "succeeded".into(),
                amount,
            })
        }

        async fn list_payment_methods(&self, _customer: &str) -> ShopResult<Vec<PaymentMethod>> {
            Ok(vec![PaymentMethod {
                id: "pm_1".into(),
                brand: Some("visa".into()),
                last4: Some("4242".into()),
                exp_month: Some(12),
                exp_year: Some(2030),
            }])
        }

        async fn verify_webhook(&self, _payload: &[u8], _signature: &str) -> ShopResult<GatewayEvent> {
            Err(ShopError::WebhookVerificationFailed("not used".into()))
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    async fn setup() -> (MemoryStore, User, Order) {
        let store = MemoryStore::new();
        let customer = store
            .insert_user(User::new("Ann", "ann@example.com", "h", Role::Customer))
            .await
            .unwrap();
        let product = Product::from_draft(
            ProductDraft {
                name: "Mug".into(),
                description: String::new(),
                price: 10.0,
                stock: 3,
            },
            Currency::USD,
        )
        .unwrap();
        let order = store
            .insert_order(Order::new(
                customer.id.clone(),
                vec![OrderItem::from_product(&product, 2)],
                Currency::USD,
                None,
            )
            .unwrap())
            .await
            .unwrap();
        (store, customer, order)
    }

    fn event(kind: GatewayEventKind, intent: &str) -> GatewayEvent {
        GatewayEvent::new("evt_1", kind).with_payment_intent(intent)
    }

    #[tokio::test]
    async fn test_start_payment_records_pending() {
        let (store, customer, order) = setup().await;
        let gateway = FakeGateway::default();

        let started = start_payment(&store, &gateway, &customer, &order.id).await.unwrap();
        assert_eq!(started.payment.status, PaymentStatus::Pending);
        assert_eq!(started.payment.amount.amount, 2000);
        assert_eq!(started.payment.payment_intent_id, started.intent.id);
        assert!(store
            .find_payment_by_intent(&started.intent.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_start_payment_checks_owner() {
        let (store, _customer, order) = setup().await;
        let gateway = FakeGateway::default();
        let stranger = User::new("Eve", "eve@example.com", "h", Role::Customer);

        let err = start_payment(&store, &gateway, &stranger, &order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::AccessDenied));
        assert_eq!(gateway.intents.load(Ordering::SeqCst), 0);

        let err = start_payment(&store, &gateway, &stranger, "nope").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_success_event_completes_payment_and_processes_order() {
        let (store, customer, order) = setup().await;
        let gateway = FakeGateway::default();
        let started = start_payment(&store, &gateway, &customer, &order.id).await.unwrap();

        let result = reconcile_event(&store, &event(GatewayEventKind::PaymentSucceeded, &started.intent.id))
            .await
            .unwrap();
        assert!(matches!(result, Reconciliation::Applied { .. }));

        let payment = store.find_payment(&started.payment.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.processed_at.is_some());

        let order = store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Completed);

        // replayed delivery lands in the same state
        reconcile_event(&store, &event(GatewayEventKind::PaymentSucceeded, &started.intent.id))
            .await
            .unwrap();
        let replayed = store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(replayed.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_failure_event_leaves_order_status() {
        let (store, customer, order) = setup().await;
        let gateway = FakeGateway::default();
        let started = start_payment(&store, &gateway, &customer, &order.id).await.unwrap();

        let failed = event(GatewayEventKind::PaymentFailed, &started.intent.id)
            .with_failure_message("Your card was declined.");
        reconcile_event(&store, &failed).await.unwrap();

        let payment = store.find_payment(&started.payment.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failure_reason.as_deref(), Some("Your card was declined."));

        let order = store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_and_ignored_events() {
        let (store, _, _) = setup().await;

        let unknown = reconcile_event(&store, &event(GatewayEventKind::PaymentSucceeded, "pi_nope"))
            .await
            .unwrap();
        assert!(matches!(unknown, Reconciliation::UnknownIntent(_)));

        let ignored = reconcile_event(
            &store,
            &GatewayEvent::new("evt_2", GatewayEventKind::Other("charge.updated".into())),
        )
        .await
        .unwrap();
        assert!(matches!(ignored, Reconciliation::Ignored));
    }

    #[tokio::test]
    async fn test_refunds() {
        let (store, customer, order) = setup().await;
        let gateway = FakeGateway::default();
        let started = start_payment(&store, &gateway, &customer, &order.id).await.unwrap();

        // pending payments cannot be refunded
        let err = refund_payment(&store, &gateway, &customer, &started.payment.id, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        reconcile_event(&store, &event(GatewayEventKind::PaymentSucceeded, &started.intent.id))
            .await
            .unwrap();

        let err = refund_payment(&store, &gateway, &customer, &started.payment.id, Some(25.0), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let partial = refund_payment(
            &store,
            &gateway,
            &customer,
            &started.payment.id,
            Some(5.0),
            Some(RefundReason::Duplicate),
        )
        .await
        .unwrap();
        assert_eq!(partial.payment.refunds.len(), 1);
        assert_eq!(partial.payment.refunds[0].amount.amount, 500);
        assert_eq!(partial.payment.status, PaymentStatus::Completed);

        let rest = refund_payment(&store, &gateway, &customer, &started.payment.id, None, None)
            .await
            .unwrap();
        assert_eq!(rest.payment.refunds[1].amount.amount, 1500);
        assert_eq!(rest.payment.status, PaymentStatus::Refunded);

        let order = store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_payment_methods_and_history() {
        let (store, mut customer, order) = setup().await;
        let gateway = FakeGateway::default();

        assert!(payment_methods(&gateway, &customer).await.unwrap().is_empty());
        customer.stripe_customer_id = Some("cus_1".into());
        assert_eq!(payment_methods(&gateway, &customer).await.unwrap().len(), 1);

        start_payment(&store, &gateway, &customer, &order.id).await.unwrap();
        let history = transaction_history(&store, &customer).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].order.as_ref().map(|o| o.id.as_str()), Some(order.id.as_str()));
    }

    async fn paid(store: &MemoryStore, gateway: &dyn PaymentGateway, customer: &User, order: &Order) -> Payment {
        let started = start_payment(store, gateway, customer, &order.id).await.unwrap();
        reconcile_event(store, &event(GatewayEventKind::PaymentSucceeded, &started.intent.id))
            .await
            .unwrap();
        store.find_payment(&started.payment.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_sub_cent_refund_rejected() {
        let (store, customer, order) = setup().await;
        let gateway = FakeGateway::default();
        let payment = paid(&store, &gateway, &customer, &order).await;

        for amount in [0.004, 0.0, -1.0, f64::NAN] {
            let err = refund_payment(&store, &gateway, &customer, &payment.id, Some(amount), None)
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 400, "amount {}", amount);
        }
        let payment = store.find_payment(&payment.id).await.unwrap().unwrap();
        assert!(payment.refunds.is_empty());
        assert_eq!(payment.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_full_refund_records_gateway_amount() {
        let (store, customer, order) = setup().await;
        let gateway = FakeGateway::default();
        let payment = paid(&store, &gateway, &customer, &order).await;

        // refunded from the gateway dashboard, unknown locally
        gateway
            .create_refund(&RefundRequest {
                payment_intent_id: payment.payment_intent_id.clone(),
                amount: Some(Price::from_cents(300, Currency::USD)),
                reason: RefundReason::RequestedByCustomer,
            })
            .await
            .unwrap();

        let issued = refund_payment(&store, &gateway, &customer, &payment.id, None, None)
            .await
            .unwrap();
        assert_eq!(issued.refund.amount, 1700);
        assert_eq!(issued.payment.refunds[0].amount.amount, 1700);
        assert_eq!(issued.payment.refunded_amount(), 1700);
    }

    /// Records a competing refund locally while the gateway call is in flight
    struct RacingGateway {
        inner: FakeGateway,
        store: Arc<MemoryStore>,
        payment_id: Mutex<Option<String>>,
    }

    #[async_trait]
    impl PaymentGateway for RacingGateway {
        async fn create_payment_intent(&self, request: &IntentRequest) -> ShopResult<PaymentIntent> {
            self.inner.create_payment_intent(request).await
        }

        async fn create_refund(&self, request: &RefundRequest) -> ShopResult<GatewayRefund> {
            let payment_id = self.payment_id.lock().unwrap().take();
            if let Some(payment_id) = payment_id {
                self.store
                    .record_refund(
                        &payment_id,
                        Refund {
                            refund_id: "re_competing".into(),
                            amount: Price::from_cents(1500, Currency::USD),
                            reason: RefundReason::Duplicate,
                            status: RefundStatus::Succeeded,
                            created_at: Utc::now(),
                        },
                    )
                    .await?;
            }
            self.inner.create_refund(request).await
        }

        async fn list_payment_methods(&self, customer: &str) -> ShopResult<Vec<PaymentMethod>> {
            self.inner.list_payment_methods(customer).await
        }

        async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent> {
            self.inner.verify_webhook(payload, signature).await
        }

        fn provider_name(&self) -> &'static str {
            "racing"
        }
    }

    #[tokio::test]
    async fn test_issued_refund_kept_when_balance_moved() {
        let (store, customer, order) = setup().await;
        let store = Arc::new(store);
        let gateway = RacingGateway {
            inner: FakeGateway::default(),
            store: store.clone(),
            payment_id: Mutex::new(None),
        };
        let payment = paid(&store, &gateway, &customer, &order).await;
        *gateway.payment_id.lock().unwrap() = Some(payment.id.clone());

        let issued = refund_payment(store.as_ref(), &gateway, &customer, &payment.id, Some(10.0), None)
            .await
            .unwrap();

        let ids: Vec<_> = issued.payment.refunds.iter().map(|r| r.refund_id.as_str()).collect();
        assert_eq!(ids, ["re_competing", issued.refund.id.as_str()]);
        assert_eq!(issued.payment.refunded_amount(), 2500);
        assert_eq!(issued.payment.status, PaymentStatus::Refunded);

        let order = store.find_order(&order.id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_admin_started_payment_belongs_to_customer() {
        let (store, customer, order) = setup().await;
        let gateway = FakeGateway::default();
        let admin = store
            .insert_user(User::new("Root", "root@example.com", "h", Role::Admin))
            .await
            .unwrap();

        let started = start_payment(&store, &gateway, &admin, &order.id).await.unwrap();
        assert_eq!(started.payment.customer_id, customer.id);
        assert!(transaction_history(&store, &admin).await.unwrap().is_empty());

        let history = transaction_history(&store, &customer).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].payment.id, started.payment.id);

        reconcile_event(&store, &event(GatewayEventKind::PaymentSucceeded, &started.intent.id))
            .await
            .unwrap();
        let issued = refund_payment(&store, &gateway, &customer, &started.payment.id, None, None)
            .await
            .unwrap();
        assert_eq!(issued.payment.status, PaymentStatus::Refunded);
    }
}
