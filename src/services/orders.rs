//! Order status changes and payment recording

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::aggregates::{GatewayRef, Order, OrderStatus, PaymentStatus, Wallet};
use crate::domain::value_objects::{OrderId, UserId};
use crate::repository::{OrderRepository, RefundCredit};
use crate::services::lifecycle::{self, TransitionOutcome};
use crate::services::publisher::EventPublisher;
use crate::services::wallet::{credited_event, WalletLedger};
use crate::{Result, StorefrontError};

/// Result of a committed status change. `wallet` is set when a refund was
/// credited as part of it.
#[derive(Clone, Debug)]
pub struct StatusUpdate {
    pub order: Order,
    pub wallet: Option<Wallet>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, publisher: Arc<dyn EventPublisher>) -> Self { Self { orders, publisher } }

    pub async fn get(&self, id: OrderId) -> Result<Order> {
        self.orders.get(id).await?.ok_or_else(|| StorefrontError::NotFound(format!("Order {}", id)))
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> { Ok(self.orders.list_for_user(user_id).await?) }

    /// Moves an order to `requested`, crediting any refund in the same commit.
    /// A concurrent change to the same order surfaces as `Conflict` and
    /// nothing is written.
    #[instrument(skip(self))]
    pub async fn update_status(&self, order_id: OrderId, requested: &str, now: DateTime<Utc>) -> Result<StatusUpdate> {
        let new_status: OrderStatus = requested.parse()?;
        let current = self.get(order_id).await?;
        let TransitionOutcome { mut order, refund } = match lifecycle::transition(&current, new_status, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(from = %current.status(), to = %new_status, "Transition rejected");
                return Err(e);
            }
        };

        let credit = match refund {
            Some(amount) => Some(RefundCredit { user_id: order.user_id(), transaction: WalletLedger::refund_entry(amount, order.id(), now)? }),
            None => None,
        };
        let wallet = self.orders.commit(&order, current.version(), credit.as_ref()).await?;
        info!(from = %current.status(), to = %new_status, refunded = credit.is_some(), "Order status updated");

        let mut events = order.take_events();
        if let (Some(wallet), Some(credit)) = (&wallet, &credit) {
            events.push(credited_event(wallet, &credit.transaction));
        }
        self.publisher.publish(events).await;
        Ok(StatusUpdate { order, wallet })
    }

    /// Records a successful gateway payment. Repeating it for a paid order
    /// changes nothing.
    #[instrument(skip(self, gateway_ref))]
    pub async fn record_payment(&self, order_id: OrderId, gateway_ref: GatewayRef, now: DateTime<Utc>) -> Result<Order> {
        let current = self.get(order_id).await?;
        if current.payment_status() == PaymentStatus::Completed {
            return Ok(current);
        }
        self.ensure_open(&current)?;
        let mut order = current.clone();
        order.attach_gateway_ref(gateway_ref, now);
        order.complete_payment(now);
        self.save(order, current.version()).await
    }

    #[instrument(skip(self))]
    pub async fn mark_payment_failed(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Order> {
        let current = self.get(order_id).await?;
        if current.payment_status() == PaymentStatus::Completed {
            return Err(StorefrontError::ValidationFailed(format!("Order {} is already paid", order_id)));
        }
        self.ensure_open(&current)?;
        let mut order = current.clone();
        order.fail_payment(now);
        self.save(order, current.version()).await
    }

    fn ensure_open(&self, order: &Order) -> Result<()> {
        if order.status().is_terminal() {
            return Err(StorefrontError::ValidationFailed(format!("Order {} is {}", order.id(), order.status())));
        }
        Ok(())
    }

    async fn save(&self, mut order: Order, expected_version: u64) -> Result<Order> {
        order.bump_version();
        self.orders.commit(&order, expected_version, None).await?;
        self.publisher.publish(order.take_events()).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{PaymentMethod, TransactionType};
    use crate::domain::events::{DomainEvent, OrderEvent, WalletEvent};
    use crate::domain::value_objects::Money;
    use crate::repository::{MemoryStore, WalletRepository};
    use crate::services::lifecycle::tests::order_in;
    use crate::services::publisher::tests::RecordingPublisher;

    struct Fixture {
        store: Arc<MemoryStore>,
        publisher: Arc<RecordingPublisher>,
        service: OrderService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let service = OrderService::new(store.clone(), publisher.clone());
        Fixture { store, publisher, service }
    }

    async fn stored(f: &Fixture, order: &Order) {
        OrderRepository::insert(f.store.as_ref(), order).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_paid_order_credits_wallet() {
        let f = fixture();
        let order = order_in(OrderStatus::Processing, PaymentMethod::OnlineGateway, PaymentStatus::Completed, 1200);
        stored(&f, &order).await;

        let update = f.service.update_status(order.id(), "Cancelled", Utc::now()).await.unwrap();
        assert_eq!(update.order.status(), OrderStatus::Cancelled);

        let wallet = WalletRepository::get(f.store.as_ref(), order.user_id()).await.unwrap().unwrap();
        assert_eq!(wallet.balance(), Money::units(1200));
        assert_eq!(wallet.transactions().len(), 1);
        assert_eq!(wallet.transactions()[0].kind, TransactionType::Refund);
        assert_eq!(update.wallet.map(|w| w.balance()), Some(Money::units(1200)));

        let events = f.publisher.events();
        assert!(events.iter().any(|e| matches!(e, DomainEvent::Order(OrderEvent::StatusChanged { to: OrderStatus::Cancelled, .. }))));
        assert!(events.iter().any(|e| matches!(e, DomainEvent::Wallet(WalletEvent::Credited { .. }))));
    }

    #[tokio::test]
    async fn test_rejected_transition_changes_nothing() {
        let f = fixture();
        let order = order_in(OrderStatus::Shipped, PaymentMethod::OnlineGateway, PaymentStatus::Completed, 700);
        stored(&f, &order).await;

        let err = f.service.update_status(order.id(), "Cancelled", Utc::now()).await.unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidTransition { .. }));
        let reloaded = f.service.get(order.id()).await.unwrap();
        assert_eq!(reloaded.status(), OrderStatus::Shipped);
        assert_eq!(reloaded.version(), order.version());
        assert!(WalletRepository::get(f.store.as_ref(), order.user_id()).await.unwrap().is_none());
        assert!(f.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_and_order() {
        let f = fixture();
        assert!(matches!(f.service.update_status(OrderId::new(), "Lost", Utc::now()).await, Err(StorefrontError::InvalidStatus(_))));
        assert!(matches!(f.service.update_status(OrderId::new(), "Shipped", Utc::now()).await, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_return_of_cash_order_refunds() {
        let f = fixture();
        let order = order_in(OrderStatus::Shipped, PaymentMethod::CashOnDelivery, PaymentStatus::Pending, 450);
        stored(&f, &order).await;

        let delivered = f.service.update_status(order.id(), "delivered", Utc::now()).await.unwrap();
        assert_eq!(delivered.order.payment_status(), PaymentStatus::Completed);
        assert!(delivered.wallet.is_none());

        let returned = f.service.update_status(order.id(), "Returned", Utc::now()).await.unwrap();
        assert_eq!(returned.wallet.unwrap().balance(), Money::units(450));
        assert_eq!(returned.order.version(), order.version() + 2);
    }

    #[tokio::test]
    async fn test_second_cancel_does_not_double_refund() {
        let f = fixture();
        let order = order_in(OrderStatus::Confirmed, PaymentMethod::OnlineGateway, PaymentStatus::Completed, 300);
        stored(&f, &order).await;

        f.service.update_status(order.id(), "Cancelled", Utc::now()).await.unwrap();
        assert!(f.service.update_status(order.id(), "Cancelled", Utc::now()).await.is_err());
        let wallet = WalletRepository::get(f.store.as_ref(), order.user_id()).await.unwrap().unwrap();
        assert_eq!(wallet.balance(), Money::units(300));
        assert_eq!(wallet.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_commit_is_a_conflict() {
        let f = fixture();
        let order = order_in(OrderStatus::Processing, PaymentMethod::OnlineGateway, PaymentStatus::Completed, 80);
        stored(&f, &order).await;

        // Another writer got there first.
        let outcome = lifecycle::transition(&order, OrderStatus::Confirmed, Utc::now()).unwrap();
        f.store.commit(&outcome.order, order.version(), None).await.unwrap();

        let late = lifecycle::transition(&order, OrderStatus::Cancelled, Utc::now()).unwrap();
        let credit = RefundCredit { user_id: order.user_id(), transaction: WalletLedger::refund_entry(Money::units(80), order.id(), Utc::now()).unwrap() };
        let err = f.store.commit(&late.order, order.version(), Some(&credit)).await.unwrap_err();
        assert!(matches!(StorefrontError::from(err), StorefrontError::Conflict(_)));
        assert!(WalletRepository::get(f.store.as_ref(), order.user_id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_payment_is_idempotent() {
        let f = fixture();
        let order = order_in(OrderStatus::Processing, PaymentMethod::OnlineGateway, PaymentStatus::Pending, 60);
        stored(&f, &order).await;
        let gateway_ref = GatewayRef { order_id: "gw_order_1".into(), payment_id: "pay_1".into(), signature: "sig".into() };

        let paid = f.service.record_payment(order.id(), gateway_ref.clone(), Utc::now()).await.unwrap();
        assert_eq!(paid.payment_status(), PaymentStatus::Completed);
        assert_eq!(paid.gateway_ref(), Some(&gateway_ref));
        let again = f.service.record_payment(order.id(), gateway_ref, Utc::now()).await.unwrap();
        assert_eq!(again.version(), paid.version());
        assert!(f.service.mark_payment_failed(order.id(), Utc::now()).await.is_err());
    }
}
