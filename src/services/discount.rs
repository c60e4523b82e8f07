//! Offer resolution
//!
//! Offers never stack: the larger of the qualifying product and category
//! percentages is applied. When both are equal the product offer is reported.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::domain::aggregates::{Offer, Product};
use crate::domain::value_objects::{Money, OfferId, Percent, ProductId, VariantId};
use crate::repository::{CatalogRepository, OfferRepository};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscountResult {
    pub original_price: Money,
    pub discounted_price: Money,
    pub discount_percent: Percent,
    pub savings: Money,
    pub offer_id: Option<OfferId>,
}

/// Best discount for `original_price` given the offers attached to the
/// product and to its category. Missing, inactive and out-of-window offers
/// count as no offer.
pub fn resolve_best_discount(
    original_price: Money,
    product_offer: Option<&Offer>,
    category_offer: Option<&Offer>,
    now: DateTime<Utc>,
) -> DiscountResult {
    let best = [category_offer, product_offer]
        .into_iter()
        .flatten()
        .filter(|offer| offer.is_applicable(now))
        .max_by_key(|offer| offer.discount_percent());

    let discount_percent = best.map(|o| o.discount_percent()).unwrap_or(Percent::ZERO);
    let savings = original_price.percent(discount_percent);
    DiscountResult {
        original_price,
        discounted_price: original_price.saturating_sub(savings),
        discount_percent,
        savings,
        offer_id: best.map(|o| o.id()),
    }
}

/// Looks up the offers a product is subject to and prices it.
#[derive(Clone)]
pub struct PricingService {
    catalog: Arc<dyn CatalogRepository>,
    offers: Arc<dyn OfferRepository>,
}

impl PricingService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, offers: Arc<dyn OfferRepository>) -> Self { Self { catalog, offers } }

    pub async fn load_product(&self, product_id: ProductId) -> Result<Product> {
        self.catalog.product(product_id).await?.ok_or_else(|| StorefrontError::NotFound(format!("Product {}", product_id)))
    }

    /// Prices `product`, or one of its variants when `variant_id` is given.
    pub async fn quote(&self, product: &Product, variant_id: Option<VariantId>, now: DateTime<Utc>) -> Result<DiscountResult> {
        let base = match variant_id {
            Some(id) => product.variant(id).map(|v| v.price).ok_or_else(|| StorefrontError::NotFound(format!("Variant {}", id)))?,
            None => product.price(),
        };

        let product_offer = match product.offer_id() {
            Some(id) => self.offers.get(id).await?,
            None => None,
        };
        let category_offer = match self.catalog.category(product.category_id()).await?.and_then(|c| c.offer_id()) {
            Some(id) => self.offers.get(id).await?,
            None => None,
        };

        let result = resolve_best_discount(base, product_offer.as_ref(), category_offer.as_ref(), now);
        debug!(product_id = %product.id(), percent = %result.discount_percent, price = %result.discounted_price, "Priced product");
        Ok(result)
    }

    pub async fn quote_product(&self, product_id: ProductId, variant_id: Option<VariantId>, now: DateTime<Utc>) -> Result<DiscountResult> {
        let product = self.load_product(product_id).await?;
        self.quote(&product, variant_id, now).await
    }
}
