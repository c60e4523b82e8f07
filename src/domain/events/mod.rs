//! Domain events
use serde::Serialize;

use crate::domain::aggregates::{OfferTarget, OrderStatus};
use crate::domain::value_objects::{Money, OfferId, OrderId, TransactionId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Wallet(WalletEvent),
    Offer(OfferEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, user_id: UserId, final_amount: Money },
    StatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus },
    PaymentCompleted { order_id: OrderId },
    PaymentFailed { order_id: OrderId },
    RefundDue { order_id: OrderId, user_id: UserId, amount: Money },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    Credited { user_id: UserId, transaction_id: TransactionId, amount: Money, balance: Money },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OfferEvent {
    Created { offer_id: OfferId, target: OfferTarget },
    Removed { offer_id: OfferId, target: OfferTarget },
}

impl DomainEvent {
    /// Subject suffix used when the event is published, e.g. `order.placed`.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Order(OrderEvent::Placed { .. }) => "order.placed",
            DomainEvent::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            DomainEvent::Order(OrderEvent::PaymentCompleted { .. }) => "order.payment_completed",
            DomainEvent::Order(OrderEvent::PaymentFailed { .. }) => "order.payment_failed",
            DomainEvent::Order(OrderEvent::RefundDue { .. }) => "order.refund_due",
            DomainEvent::Wallet(WalletEvent::Credited { .. }) => "wallet.credited",
            DomainEvent::Offer(OfferEvent::Created { .. }) => "offer.created",
            DomainEvent::Offer(OfferEvent::Removed { .. }) => "offer.removed",
        }
    }
}
