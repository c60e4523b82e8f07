//! Offer administration
//!
//! A product or category holds at most one offer. Creating an offer for a
//! target that already has one replaces the reference and deactivates the
//! displaced offer.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::aggregates::{Offer, OfferDraft, OfferTarget};
use crate::domain::events::{DomainEvent, OfferEvent};
use crate::domain::value_objects::OfferId;
use crate::repository::{CatalogRepository, OfferRepository};
use crate::services::publisher::EventPublisher;
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct OfferService {
    catalog: Arc<dyn CatalogRepository>,
    offers: Arc<dyn OfferRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl OfferService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, offers: Arc<dyn OfferRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { catalog, offers, publisher }
    }

    pub async fn get(&self, id: OfferId) -> Result<Offer> {
        self.offers.get(id).await?.ok_or_else(|| StorefrontError::NotFound(format!("Offer {}", id)))
    }

    /// Offer currently referenced by `target`, if the target exists.
    async fn attached(&self, target: OfferTarget) -> Result<Option<Option<OfferId>>> {
        Ok(match target {
            OfferTarget::Product(id) => self.catalog.product(id).await?.map(|p| p.offer_id()),
            OfferTarget::Category(id) => self.catalog.category(id).await?.map(|c| c.offer_id()),
        })
    }

    #[instrument(skip(self, draft), fields(target = ?draft.target, percent = %draft.discount_percent))]
    pub async fn create_offer(&self, draft: OfferDraft, now: DateTime<Utc>) -> Result<Offer> {
        let offer = Offer::create(draft, now)?;
        if self.attached(offer.target()).await?.is_none() {
            return Err(StorefrontError::NotFound(format!("Offer target {:?}", offer.target())));
        }

        self.offers.insert(&offer).await?;
        let displaced = self.catalog.set_offer(offer.target(), Some(offer.id()), now).await?;
        if let Some(previous) = displaced.filter(|id| *id != offer.id()) {
            if let Some(mut old) = self.offers.get(previous).await? {
                old.deactivate();
                self.offers.save(&old).await?;
                info!(offer_id = %previous, "Displaced offer deactivated");
            }
        }

        info!(offer_id = %offer.id(), "Offer created");
        self.publisher.publish(vec![DomainEvent::Offer(OfferEvent::Created { offer_id: offer.id(), target: offer.target() })]).await;
        Ok(offer)
    }

    /// Removes the offer and clears the target's reference if it still points
    /// here. A target that was deleted in the meantime is skipped.
    #[instrument(skip(self))]
    pub async fn delete_offer(&self, id: OfferId, now: DateTime<Utc>) -> Result<()> {
        let offer = self.get(id).await?;
        if self.attached(offer.target()).await?.flatten() == Some(id) {
            self.catalog.set_offer(offer.target(), None, now).await?;
        }
        if !self.offers.delete(id).await? {
            return Err(StorefrontError::NotFound(format!("Offer {}", id)));
        }

        info!("Offer deleted");
        self.publisher.publish(vec![DomainEvent::Offer(OfferEvent::Removed { offer_id: id, target: offer.target() })]).await;
        Ok(())
    }
}
