//! Order state machine
//!
//! ```text
//! Processing -> Confirmed -> Shipped -> Delivered -> Returned
//!      |            |
//!      +------------+-> Cancelled
//! ```
//!
//! Moves along the fulfillment path only go forward, and may skip steps.
//! Shipped and Delivered orders cannot be cancelled, only Delivered orders
//! can be returned, and Cancelled and Returned are final.

use chrono::{DateTime, Utc};

use crate::domain::aggregates::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::value_objects::Money;
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionRule {
    /// Forward along Processing, Confirmed, Shipped, Delivered.
    Advance,
    /// Refund if paid online.
    Cancel,
    /// Refund if paid by any method.
    Return,
    Forbidden,
}

pub fn rule(from: OrderStatus, to: OrderStatus) -> TransitionRule {
    use OrderStatus::*;
    match (from, to) {
        (Cancelled | Returned, _) => TransitionRule::Forbidden,
        (Processing | Confirmed, Cancelled) => TransitionRule::Cancel,
        (Delivered, Returned) => TransitionRule::Return,
        (_, Cancelled | Returned) => TransitionRule::Forbidden,
        (from, to) => match (from.fulfillment_rank(), to.fulfillment_rank()) {
            (Some(current), Some(next)) if next > current => TransitionRule::Advance,
            _ => TransitionRule::Forbidden,
        },
    }
}

/// Statuses `status` may move to, in path order.
pub fn next_statuses(status: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL.into_iter().filter(|to| rule(status, *to) != TransitionRule::Forbidden).collect()
}

#[derive(Clone, Debug)]
pub struct TransitionOutcome {
    pub order: Order,
    /// Amount to credit to the owner's wallet in the same commit.
    pub refund: Option<Money>,
}

fn refund_due(order: &Order, rule: TransitionRule) -> Option<Money> {
    let paid = order.payment_status() == PaymentStatus::Completed;
    let qualifies = match rule {
        TransitionRule::Cancel => paid && order.payment_method() == PaymentMethod::OnlineGateway,
        TransitionRule::Return => paid,
        TransitionRule::Advance | TransitionRule::Forbidden => false,
    };
    Some(order.final_amount()).filter(|amount| qualifies && !amount.is_zero())
}

/// Applies `new_status` to a copy of `order`. The input is left untouched, so
/// a rejected request leaves the caller's order exactly as it was.
pub fn transition(order: &Order, new_status: OrderStatus, now: DateTime<Utc>) -> Result<TransitionOutcome> {
    let from = order.status();
    let rule = rule(from, new_status);
    if rule == TransitionRule::Forbidden {
        return Err(StorefrontError::InvalidTransition { from, to: new_status });
    }

    let refund = refund_due(order, rule);
    let mut next = order.clone();
    if new_status == OrderStatus::Delivered {
        next.complete_payment(now);
    }
    next.set_status(new_status, now);
    if let Some(amount) = refund {
        next.note_refund_due(amount);
    }
    next.bump_version();
    Ok(TransitionOutcome { order: next, refund })
}
