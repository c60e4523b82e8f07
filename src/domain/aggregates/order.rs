//! Order Aggregate
//!
//! Lines, shipping address and coupon are snapshots taken at checkout so that
//! later catalog edits never rewrite historical orders. Status changes go
//! through `services::lifecycle`; this type only records them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::aggregates::{CouponType, VariantAttribute};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{CouponCode, CouponId, Money, MoneyError, OrderId, ProductId, UserId, VariantId};
use crate::StorefrontError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    products: Vec<LineItem>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    order_status: OrderStatus,
    total_amount: Money,
    discount_amount: Money,
    final_amount: Money,
    coupon: Option<CouponSnapshot>,
    gateway_ref: Option<GatewayRef>,
    history: Vec<StatusChange>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Price charged per unit, offers already applied.
    pub unit_price: Money,
    pub variant: VariantSnapshot,
}

impl LineItem {
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.unit_price.multiply(self.quantity) }

    /// Sum of the line totals.
    pub fn subtotal(lines: &[LineItem]) -> Result<Money, MoneyError> {
        lines.iter().try_fold(Money::ZERO, |acc, l| acc.add(l.line_total()?))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantSnapshot { pub name: String, pub price: Money, pub attributes: Vec<VariantAttribute> }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress { pub address: String, pub city: String, pub state: String, pub country: String, pub pin_code: String }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouponSnapshot { pub coupon_id: CouponId, pub code: CouponCode, pub discount_type: CouponType, pub discount_amount: Money }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRef { pub order_id: String, pub payment_id: String, pub signature: String }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange { pub from: OrderStatus, pub to: OrderStatus, pub at: DateTime<Utc> }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { CashOnDelivery, OnlineGateway }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Completed, Failed }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Completed => "completed", Self::Failed => "failed" }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Processing, Confirmed, Shipped, Delivered, Cancelled, Returned }

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Processing,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, OrderStatus::Cancelled | OrderStatus::Returned) }

    /// Position on the fulfillment path; `None` for the terminal side branches.
    pub fn fulfillment_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Processing => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled | OrderStatus::Returned => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| StorefrontError::InvalidStatus(s.to_string()))
    }
}

/// Everything checkout has resolved before the order exists.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub user_id: UserId,
    pub lines: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub coupon: Option<CouponSnapshot>,
}

impl Order {
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Result<Self, OrderError> {
        if new.lines.is_empty() { return Err(OrderError::NoItems); }
        if new.lines.iter().any(|l| l.quantity == 0) { return Err(OrderError::InvalidQuantity); }

        let total_amount = LineItem::subtotal(&new.lines).map_err(|_| OrderError::TotalOverflow)?;
        let discount_amount = new.coupon.as_ref().map(|c| c.discount_amount).unwrap_or(Money::ZERO).min(total_amount);
        let final_amount = total_amount.saturating_sub(discount_amount);

        let mut order = Self {
            id: OrderId::new(), user_id: new.user_id, products: new.lines, shipping_address: new.shipping_address,
            payment_method: new.payment_method, payment_status: PaymentStatus::Pending, order_status: OrderStatus::Processing,
            total_amount, discount_amount, final_amount, coupon: new.coupon, gateway_ref: None,
            history: vec![], version: 1, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: order.id, user_id: order.user_id, final_amount }));
        Ok(order)
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn products(&self) -> &[LineItem] { &self.products }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn status(&self) -> OrderStatus { self.order_status }
    pub fn total_amount(&self) -> Money { self.total_amount }
    pub fn discount_amount(&self) -> Money { self.discount_amount }
    pub fn final_amount(&self) -> Money { self.final_amount }
    pub fn coupon(&self) -> Option<&CouponSnapshot> { self.coupon.as_ref() }
    pub fn gateway_ref(&self) -> Option<&GatewayRef> { self.gateway_ref.as_ref() }
    pub fn history(&self) -> &[StatusChange] { &self.history }
    pub fn version(&self) -> u64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub(crate) fn set_status(&mut self, to: OrderStatus, now: DateTime<Utc>) {
        let from = self.order_status;
        self.order_status = to;
        self.history.push(StatusChange { from, to, at: now });
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to }));
    }

    pub(crate) fn complete_payment(&mut self, now: DateTime<Utc>) {
        if self.payment_status == PaymentStatus::Completed { return; }
        self.payment_status = PaymentStatus::Completed;
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentCompleted { order_id: self.id }));
    }

    pub(crate) fn fail_payment(&mut self, now: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Failed;
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentFailed { order_id: self.id }));
    }

    pub(crate) fn attach_gateway_ref(&mut self, gateway_ref: GatewayRef, now: DateTime<Utc>) {
        self.gateway_ref = Some(gateway_ref);
        self.touch(now);
    }

    pub(crate) fn note_refund_due(&mut self, amount: Money) {
        self.raise_event(DomainEvent::Order(OrderEvent::RefundDue { order_id: self.id, user_id: self.user_id, amount }));
    }

    /// Called once per committed change; the store compares against the
    /// version that was read.
    pub(crate) fn bump_version(&mut self) { self.version += 1; }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; }
}

#[derive(Debug, Clone)] pub enum OrderError { NoItems, InvalidQuantity, TotalOverflow }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order has no items"),
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
            Self::TotalOverflow => write!(f, "Order total is too large"),
        }
    }
}

impl From<OrderError> for StorefrontError {
    fn from(err: OrderError) -> Self { StorefrontError::ValidationFailed(err.to_string()) }
}
