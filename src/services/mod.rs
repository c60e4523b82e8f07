//! Application services
//!
//! Each service owns one slice of the storefront and talks to storage only
//! through the repository traits.

pub mod checkout;
pub mod coupons;
pub mod discount;
pub mod lifecycle;
pub mod offers;
pub mod orders;
pub mod publisher;
pub mod wallet;

pub use checkout::{Checkout, PlaceOrder};
pub use coupons::{CouponService, CouponValidation};
pub use discount::{resolve_best_discount, DiscountResult, PricingService};
pub use lifecycle::{transition, TransitionOutcome, TransitionRule};
pub use offers::OfferService;
pub use orders::{OrderService, StatusUpdate};
pub use publisher::{EventPublisher, LogPublisher, NatsPublisher};
pub use wallet::WalletLedger;

use std::sync::Arc;

use crate::repository::{CatalogRepository, CouponRepository, OfferRepository, OrderRepository, WalletRepository};

/// Everything the HTTP layer needs, wired over one store.
#[derive(Clone)]
pub struct Services {
    pub pricing: PricingService,
    pub coupons: CouponService,
    pub offers: OfferService,
    pub wallet: WalletLedger,
    pub orders: OrderService,
    pub checkout: Checkout,
}

impl Services {
    pub fn from_store<S>(store: Arc<S>, publisher: Arc<dyn EventPublisher>) -> Self
    where
        S: OrderRepository + WalletRepository + CouponRepository + OfferRepository + CatalogRepository + 'static,
    {
        let pricing = PricingService::new(store.clone(), store.clone());
        let coupons = CouponService::new(store.clone());
        Self {
            offers: OfferService::new(store.clone(), store.clone(), publisher.clone()),
            wallet: WalletLedger::new(store.clone(), publisher.clone()),
            orders: OrderService::new(store.clone(), publisher.clone()),
            checkout: Checkout::new(pricing.clone(), coupons.clone(), store, publisher),
            pricing,
            coupons,
        }
    }
}
