//! Coupon Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::aggregates::CouponSnapshot;
use crate::domain::value_objects::{CouponCode, CouponId, Money, Percent};
use crate::StorefrontError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    id: CouponId,
    name: CouponCode,
    coupon_type: CouponType,
    offer_price: Money,
    minimum_price: Money,
    expire_on: DateTime<Utc>,
    is_listed: ListingStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponType { Fixed, Percentage }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus { #[default] Active, Blocked }

/// Admin input for creating or editing a coupon.
#[derive(Clone, Debug)]
pub struct CouponDraft {
    pub name: CouponCode,
    pub coupon_type: CouponType,
    pub offer_price: Money,
    pub minimum_price: Money,
    pub expire_on: DateTime<Utc>,
}

impl CouponDraft {
    fn check(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if self.offer_price.is_zero() { return Err(CouponError::ZeroDiscount); }
        if self.coupon_type == CouponType::Percentage && Percent::new(self.offer_price.amount()).is_err() {
            return Err(CouponError::PercentageOutOfRange);
        }
        if self.expire_on <= now { return Err(CouponError::ExpiryInPast); }
        Ok(())
    }
}

impl Coupon {
    pub fn create(draft: CouponDraft, now: DateTime<Utc>) -> Result<Self, CouponError> {
        draft.check(now)?;
        Ok(Self {
            id: CouponId::new(), name: draft.name, coupon_type: draft.coupon_type, offer_price: draft.offer_price,
            minimum_price: draft.minimum_price, expire_on: draft.expire_on, is_listed: ListingStatus::Active,
            created_at: now, updated_at: now,
        })
    }

    pub fn id(&self) -> CouponId { self.id }
    pub fn name(&self) -> &CouponCode { &self.name }
    pub fn coupon_type(&self) -> CouponType { self.coupon_type }
    pub fn offer_price(&self) -> Money { self.offer_price }
    pub fn minimum_price(&self) -> Money { self.minimum_price }
    pub fn expire_on(&self) -> DateTime<Utc> { self.expire_on }
    pub fn listing(&self) -> ListingStatus { self.is_listed }

    /// Listed and not yet expired. The minimum purchase is checked separately
    /// because it depends on the cart.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_listed == ListingStatus::Active && self.expire_on > now
    }

    pub fn meets_minimum(&self, subtotal: Money) -> bool { subtotal >= self.minimum_price }

    /// Discount this coupon grants on `subtotal`, never more than the subtotal.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let discount = match self.coupon_type {
            // offer_price is kept within [0, 100] for percentage coupons
            CouponType::Percentage => Percent::new(self.offer_price.amount()).map(|pct| subtotal.percent(pct)).unwrap_or(Money::ZERO),
            CouponType::Fixed => self.offer_price,
        };
        discount.min(subtotal)
    }

    pub fn snapshot(&self, subtotal: Money) -> CouponSnapshot {
        CouponSnapshot { coupon_id: self.id, code: self.name.clone(), discount_type: self.coupon_type, discount_amount: self.discount_for(subtotal) }
    }

    pub fn edit(&mut self, draft: CouponDraft, now: DateTime<Utc>) -> Result<(), CouponError> {
        draft.check(now)?;
        self.name = draft.name;
        self.coupon_type = draft.coupon_type;
        self.offer_price = draft.offer_price;
        self.minimum_price = draft.minimum_price;
        self.expire_on = draft.expire_on;
        self.updated_at = now;
        Ok(())
    }

    pub fn block(&mut self, now: DateTime<Utc>) { self.is_listed = ListingStatus::Blocked; self.updated_at = now; }
    pub fn activate(&mut self, now: DateTime<Utc>) { self.is_listed = ListingStatus::Active; self.updated_at = now; }
}

#[derive(Debug, Clone)] pub enum CouponError { ZeroDiscount, PercentageOutOfRange, ExpiryInPast }
impl std::error::Error for CouponError {}
impl fmt::Display for CouponError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDiscount => write!(f, "Coupon discount must be greater than zero"),
            Self::PercentageOutOfRange => write!(f, "Percentage coupons must be between 0 and 100"),
            Self::ExpiryInPast => write!(f, "Coupon expiry must be in the future"),
        }
    }
}

impl From<CouponError> for StorefrontError {
    fn from(err: CouponError) -> Self { StorefrontError::ValidationFailed(err.to_string()) }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn draft(name: &str, coupon_type: CouponType, offer: u32, minimum: u32, now: DateTime<Utc>) -> CouponDraft {
        CouponDraft {
            name: CouponCode::new(name).unwrap(), coupon_type, offer_price: Money::units(offer),
            minimum_price: Money::units(minimum), expire_on: now + Duration::days(30),
        }
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let now = Utc::now();
        let coupon = Coupon::create(draft("FLAT500", CouponType::Fixed, 500, 0, now), now).unwrap();
        assert_eq!(coupon.discount_for(Money::units(300)), Money::units(300));
        assert_eq!(coupon.discount_for(Money::units(800)), Money::units(500));
    }

    #[test]
    fn test_percentage_discount() {
        let now = Utc::now();
        let coupon = Coupon::create(draft("TEN", CouponType::Percentage, 10, 0, now), now).unwrap();
        assert_eq!(coupon.discount_for(Money::units(450)), Money::units(45));
    }

    #[test]
    fn test_percentage_discount_on_huge_subtotal() {
        let now = Utc::now();
        let coupon = Coupon::create(draft("HALF", CouponType::Percentage, 50, 0, now), now).unwrap();
        let subtotal = Money::new(rust_decimal::Decimal::MAX).unwrap();
        let discount = coupon.discount_for(subtotal);
        assert!(discount > Money::ZERO);
        assert!(discount < subtotal);
    }

    #[test]
    fn test_redeemable_window_and_listing() {
        let now = Utc::now();
        let mut coupon = Coupon::create(draft("TEN", CouponType::Percentage, 10, 0, now), now).unwrap();
        assert!(coupon.is_redeemable(now));
        assert!(!coupon.is_redeemable(coupon.expire_on()));
        coupon.block(now);
        assert!(!coupon.is_redeemable(now));
    }

    #[test]
    fn test_create_rejects_bad_drafts() {
        let now = Utc::now();
        assert!(matches!(Coupon::create(draft("HUGE", CouponType::Percentage, 150, 0, now), now), Err(CouponError::PercentageOutOfRange)));
        assert!(matches!(Coupon::create(draft("NONE", CouponType::Fixed, 0, 0, now), now), Err(CouponError::ZeroDiscount)));
        let mut stale = draft("OLD", CouponType::Fixed, 10, 0, now);
        stale.expire_on = now - Duration::days(1);
        assert!(matches!(Coupon::create(stale, now), Err(CouponError::ExpiryInPast)));
    }
}
