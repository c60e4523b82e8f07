//! Catalog Aggregates
//!
//! Only what checkout and offer administration read: prices, variants and the
//! single offer back-reference a product or category may hold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CategoryId, Money, OfferId, ProductId, VariantId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    category_id: CategoryId,
    price: Money,
    variants: Vec<Variant>,
    status: ProductStatus,
    offer_id: Option<OfferId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant { pub id: VariantId, pub name: String, pub price: Money, pub attributes: Vec<VariantAttribute> }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttribute { pub name: String, pub value: String }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Listed, Unlisted }

impl Product {
    pub fn create(name: impl Into<String>, category_id: CategoryId, price: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: ProductId::new(), name: name.into(), category_id, price, variants: vec![],
            status: ProductStatus::Listed, offer_id: None, created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> ProductId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn category_id(&self) -> CategoryId { self.category_id }
    pub fn price(&self) -> Money { self.price }
    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn status(&self) -> ProductStatus { self.status }
    pub fn offer_id(&self) -> Option<OfferId> { self.offer_id }
    pub fn is_listed(&self) -> bool { self.status == ProductStatus::Listed }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> { self.variants.iter().find(|v| v.id == id) }

    pub fn add_variant(&mut self, variant: Variant, now: DateTime<Utc>) {
        self.variants.push(variant);
        self.updated_at = now;
    }

    pub fn unlist(&mut self, now: DateTime<Utc>) { self.status = ProductStatus::Unlisted; self.updated_at = now; }

    /// Replaces whatever offer was attached before.
    pub fn set_offer(&mut self, offer_id: Option<OfferId>, now: DateTime<Utc>) {
        self.offer_id = offer_id;
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    offer_id: Option<OfferId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { id: CategoryId::new(), name: name.into(), offer_id: None, created_at: now, updated_at: now }
    }

    pub fn id(&self) -> CategoryId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn offer_id(&self) -> Option<OfferId> { self.offer_id }

    pub fn set_offer(&mut self, offer_id: Option<OfferId>, now: DateTime<Utc>) {
        self.offer_id = offer_id;
        self.updated_at = now;
    }
}
