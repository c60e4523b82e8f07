//! Offer Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_objects::{CategoryId, OfferId, Percent, ProductId};
use crate::StorefrontError;

/// What an offer is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum OfferTarget {
    Product(ProductId),
    Category(CategoryId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    id: OfferId,
    target: OfferTarget,
    discount_percent: Percent,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct OfferDraft {
    pub target: OfferTarget,
    pub discount_percent: Percent,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Offer {
    pub fn create(draft: OfferDraft, now: DateTime<Utc>) -> Result<Self, OfferError> {
        if draft.start_date > draft.end_date { return Err(OfferError::WindowReversed); }
        Ok(Self {
            id: OfferId::new(), target: draft.target, discount_percent: draft.discount_percent,
            start_date: draft.start_date, end_date: draft.end_date, is_active: true, created_at: now,
        })
    }

    pub fn id(&self) -> OfferId { self.id }
    pub fn target(&self) -> OfferTarget { self.target }
    pub fn discount_percent(&self) -> Percent { self.discount_percent }
    pub fn start_date(&self) -> DateTime<Utc> { self.start_date }
    pub fn end_date(&self) -> DateTime<Utc> { self.end_date }
    pub fn is_active(&self) -> bool { self.is_active }

    /// Active and `start_date <= now <= end_date`.
    pub fn is_applicable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    pub fn deactivate(&mut self) { self.is_active = false; }
}

#[derive(Debug, Clone)] pub enum OfferError { WindowReversed }
impl std::error::Error for OfferError {}
impl fmt::Display for OfferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Offer start date must not be after its end date") }
}

impl From<OfferError> for StorefrontError {
    fn from(err: OfferError) -> Self { StorefrontError::ValidationFailed(err.to_string()) }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn running_offer(target: OfferTarget, pct: u8, now: DateTime<Utc>) -> Offer {
        Offer::create(OfferDraft { target, discount_percent: Percent::whole(pct).unwrap(), start_date: now - Duration::days(1), end_date: now + Duration::days(1) }, now).unwrap()
    }

    #[test]
    fn test_window_is_inclusive() {
        let now = Utc::now();
        let offer = running_offer(OfferTarget::Product(ProductId::new()), 10, now);
        assert!(offer.is_applicable(offer.start_date()));
        assert!(offer.is_applicable(offer.end_date()));
        assert!(!offer.is_applicable(offer.end_date() + Duration::seconds(1)));
        assert!(!offer.is_applicable(offer.start_date() - Duration::seconds(1)));
    }

    #[test]
    fn test_inactive_offer_never_applies() {
        let now = Utc::now();
        let mut offer = running_offer(OfferTarget::Category(CategoryId::new()), 10, now);
        offer.deactivate();
        assert!(!offer.is_applicable(now));
    }

    #[test]
    fn test_reversed_window_rejected() {
        let now = Utc::now();
        let draft = OfferDraft { target: OfferTarget::Product(ProductId::new()), discount_percent: Percent::ZERO, start_date: now, end_date: now - Duration::hours(1) };
        assert!(matches!(Offer::create(draft, now), Err(OfferError::WindowReversed)));
    }

    #[test]
    fn test_target_serializes_tagged() {
        let id = ProductId::new();
        let json = serde_json::to_value(OfferTarget::Product(id)).unwrap();
        assert_eq!(json["type"], "product");
        assert_eq!(json["id"], id.to_string());
    }
}
