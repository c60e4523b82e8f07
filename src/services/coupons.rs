//! Coupon validation and administration

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::aggregates::{Coupon, CouponDraft};
use crate::domain::value_objects::{CouponId, Money};
use crate::repository::CouponRepository;
use crate::{Result, StorefrontError};

pub const INVALID_COUPON: &str = "Invalid or expired coupon code";

#[derive(Clone, Debug, PartialEq)]
pub enum CouponValidation {
    Valid { coupon: Coupon, discount: Money },
    Invalid { reason: String },
}

impl CouponValidation {
    pub fn is_valid(&self) -> bool { matches!(self, CouponValidation::Valid { .. }) }

    /// The coupon, or `ValidationFailed` carrying the reason.
    pub fn into_coupon(self) -> Result<Coupon> {
        match self {
            CouponValidation::Valid { coupon, .. } => Ok(coupon),
            CouponValidation::Invalid { reason } => Err(StorefrontError::ValidationFailed(reason)),
        }
    }
}

#[derive(Clone)]
pub struct CouponService {
    coupons: Arc<dyn CouponRepository>,
}

impl CouponService {
    pub fn new(coupons: Arc<dyn CouponRepository>) -> Self { Self { coupons } }

    /// Exact-code lookup, then listing, expiry and minimum purchase checks.
    pub async fn validate_coupon(&self, code: &str, cart_subtotal: Money, now: DateTime<Utc>) -> Result<CouponValidation> {
        let coupon = match self.coupons.find_by_name(code.trim()).await? {
            Some(coupon) if coupon.is_redeemable(now) => coupon,
            _ => {
                debug!(code, "Coupon rejected: unknown, blocked or expired");
                return Ok(CouponValidation::Invalid { reason: INVALID_COUPON.to_string() });
            }
        };
        if !coupon.meets_minimum(cart_subtotal) {
            return Ok(CouponValidation::Invalid {
                reason: format!("Minimum purchase of {} required to use this coupon", coupon.minimum_price()),
            });
        }
        let discount = coupon.discount_for(cart_subtotal);
        Ok(CouponValidation::Valid { coupon, discount })
    }

    pub async fn get(&self, id: CouponId) -> Result<Coupon> {
        self.coupons.get(id).await?.ok_or_else(|| StorefrontError::NotFound(format!("Coupon {}", id)))
    }

    #[instrument(skip(self, draft), fields(code = %draft.name))]
    pub async fn create(&self, draft: CouponDraft, now: DateTime<Utc>) -> Result<Coupon> {
        if self.coupons.find_by_name(draft.name.as_str()).await?.is_some() {
            return Err(StorefrontError::ValidationFailed(format!("Coupon code {} already exists", draft.name)));
        }
        let coupon = Coupon::create(draft, now)?;
        self.coupons.insert(&coupon).await?;
        info!(coupon_id = %coupon.id(), "Coupon created");
        Ok(coupon)
    }

    #[instrument(skip(self, draft))]
    pub async fn edit(&self, id: CouponId, draft: CouponDraft, now: DateTime<Utc>) -> Result<Coupon> {
        let mut coupon = self.get(id).await?;
        if let Some(other) = self.coupons.find_by_name(draft.name.as_str()).await? {
            if other.id() != id {
                return Err(StorefrontError::ValidationFailed(format!("Coupon code {} already exists", draft.name)));
            }
        }
        coupon.edit(draft, now)?;
        self.coupons.save(&coupon).await?;
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn block(&self, id: CouponId, now: DateTime<Utc>) -> Result<Coupon> {
        let mut coupon = self.get(id).await?;
        coupon.block(now);
        self.coupons.save(&coupon).await?;
        info!("Coupon blocked");
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, id: CouponId, now: DateTime<Utc>) -> Result<Coupon> {
        let mut coupon = self.get(id).await?;
        coupon.activate(now);
        self.coupons.save(&coupon).await?;
        Ok(coupon)
    }

    /// Hard delete. Orders keep their own snapshot of the coupon.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CouponId) -> Result<()> {
        if !self.coupons.delete(id).await? {
            return Err(StorefrontError::NotFound(format!("Coupon {}", id)));
        }
        info!("Coupon deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::coupon::tests::draft;
    use crate::domain::aggregates::CouponType;
    use crate::repository::MemoryStore;
    use chrono::Duration;

    fn service() -> CouponService { CouponService::new(Arc::new(MemoryStore::new())) }

    #[tokio::test]
    async fn test_valid_coupon() {
        let svc = service();
        let now = Utc::now();
        svc.create(draft("SAVE10", CouponType::Percentage, 10, 500, now), now).await.unwrap();
        match svc.validate_coupon("SAVE10", Money::units(800), now).await.unwrap() {
            CouponValidation::Valid { coupon, discount } => {
                assert_eq!(coupon.name().as_str(), "SAVE10");
                assert_eq!(discount, Money::units(80));
            }
            other => panic!("expected valid coupon, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_percentage_coupon_on_max_subtotal() {
        let svc = service();
        let now = Utc::now();
        svc.create(draft("HALF", CouponType::Percentage, 50, 0, now), now).await.unwrap();
        let subtotal = Money::new(rust_decimal::Decimal::MAX).unwrap();
        match svc.validate_coupon("HALF", subtotal, now).await.unwrap() {
            CouponValidation::Valid { discount, .. } => assert!(discount > Money::ZERO && discount < subtotal),
            other => panic!("expected valid coupon, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_below_minimum_names_the_minimum() {
        let svc = service();
        let now = Utc::now();
        svc.create(draft("SAVE10", CouponType::Percentage, 10, 500, now), now).await.unwrap();
        match svc.validate_coupon("SAVE10", Money::units(499), now).await.unwrap() {
            CouponValidation::Invalid { reason } => assert!(reason.contains("500"), "{}", reason),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expired_coupon_never_valid() {
        let svc = service();
        let now = Utc::now();
        svc.create(draft("SUMMER", CouponType::Fixed, 100, 0, now), now).await.unwrap();
        let after_expiry = now + Duration::days(31);
        for subtotal in [0, 100, 1_000_000] {
            let result = svc.validate_coupon("SUMMER", Money::units(subtotal), after_expiry).await.unwrap();
            assert_eq!(result, CouponValidation::Invalid { reason: INVALID_COUPON.to_string() });
        }
    }

    #[tokio::test]
    async fn test_blocked_and_unknown_codes() {
        let svc = service();
        let now = Utc::now();
        let coupon = svc.create(draft("VIP", CouponType::Fixed, 100, 0, now), now).await.unwrap();
        svc.block(coupon.id(), now).await.unwrap();
        assert!(!svc.validate_coupon("VIP", Money::units(1000), now).await.unwrap().is_valid());
        assert!(!svc.validate_coupon("vip", Money::units(1000), now).await.unwrap().is_valid());
        svc.activate(coupon.id(), now).await.unwrap();
        assert!(svc.validate_coupon("VIP", Money::units(1000), now).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_duplicate_code_and_delete() {
        let svc = service();
        let now = Utc::now();
        let coupon = svc.create(draft("ONCE", CouponType::Fixed, 10, 0, now), now).await.unwrap();
        assert!(matches!(svc.create(draft("ONCE", CouponType::Fixed, 20, 0, now), now).await, Err(StorefrontError::ValidationFailed(_))));
        svc.delete(coupon.id()).await.unwrap();
        assert!(matches!(svc.delete(coupon.id()).await, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_edit_cannot_steal_code() {
        let svc = service();
        let now = Utc::now();
        svc.create(draft("TAKEN", CouponType::Fixed, 10, 0, now), now).await.unwrap();
        let other = svc.create(draft("OTHER", CouponType::Fixed, 10, 0, now), now).await.unwrap();
        assert!(svc.edit(other.id(), draft("TAKEN", CouponType::Fixed, 15, 0, now), now).await.is_err());
        let edited = svc.edit(other.id(), draft("OTHER", CouponType::Fixed, 15, 0, now), now).await.unwrap();
        assert_eq!(edited.offer_price(), Money::units(15));
    }
}
