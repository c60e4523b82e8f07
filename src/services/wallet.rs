//! Wallet ledger
//!
//! The one refund contract. Order transitions build their credit through
//! [`WalletLedger::refund_entry`] and commit it with the order. Refunds made
//! outside a status change, such as `POST /api/v1/wallets/:user_id/refunds`,
//! go through [`WalletLedger::issue_refund`].

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::aggregates::{Wallet, WalletTransaction};
use crate::domain::events::{DomainEvent, WalletEvent};
use crate::domain::value_objects::{Money, OrderId, UserId};
use crate::repository::WalletRepository;
use crate::services::publisher::EventPublisher;
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct WalletLedger {
    wallets: Arc<dyn WalletRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl WalletLedger {
    pub fn new(wallets: Arc<dyn WalletRepository>, publisher: Arc<dyn EventPublisher>) -> Self { Self { wallets, publisher } }

    /// Completed refund entry for `order_id`; `InvalidAmount` for zero.
    pub fn refund_entry(amount: Money, order_id: OrderId, now: DateTime<Utc>) -> Result<WalletTransaction> {
        Ok(WalletTransaction::refund(amount, order_id, now)?)
    }

    /// Credits `amount` to the user's wallet, opening it on first use.
    #[instrument(skip(self, amount), fields(amount = %amount))]
    pub async fn issue_refund(&self, user_id: UserId, amount: Money, order_id: OrderId, now: DateTime<Utc>) -> Result<Wallet> {
        let entry = Self::refund_entry(amount, order_id, now)?;
        let wallet = self.wallets.credit(user_id, &entry).await?;
        info!(balance = %wallet.balance(), "Refund credited");
        self.publisher.publish(vec![credited_event(&wallet, &entry)]).await;
        Ok(wallet)
    }

    pub async fn wallet(&self, user_id: UserId) -> Result<Wallet> {
        self.wallets.get(user_id).await?.ok_or_else(|| StorefrontError::NotFound(format!("Wallet for user {}", user_id)))
    }
}

pub(crate) fn credited_event(wallet: &Wallet, entry: &WalletTransaction) -> DomainEvent {
    DomainEvent::Wallet(WalletEvent::Credited { user_id: wallet.user_id(), transaction_id: entry.id, amount: entry.amount, balance: wallet.balance() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::TransactionType;
    use crate::repository::MemoryStore;
    use crate::services::publisher::tests::RecordingPublisher;

    #[tokio::test]
    async fn test_first_refund_opens_wallet() {
        let publisher = Arc::new(RecordingPublisher::default());
        let ledger = WalletLedger::new(Arc::new(MemoryStore::new()), publisher.clone());
        let (user_id, order_id) = (UserId::new(), OrderId::new());

        assert!(matches!(ledger.wallet(user_id).await, Err(StorefrontError::NotFound(_))));
        let wallet = ledger.issue_refund(user_id, Money::units(640), order_id, Utc::now()).await.unwrap();
        assert_eq!(wallet.balance(), Money::units(640));
        assert_eq!(wallet.transactions().len(), 1);
        assert_eq!(wallet.transactions()[0].kind, TransactionType::Refund);
        assert_eq!(wallet.transactions()[0].description, format!("Refund for order {}", order_id));
        assert_eq!(publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn test_refunds_accumulate() {
        let ledger = WalletLedger::new(Arc::new(MemoryStore::new()), Arc::new(RecordingPublisher::default()));
        let user_id = UserId::new();
        ledger.issue_refund(user_id, Money::units(100), OrderId::new(), Utc::now()).await.unwrap();
        let wallet = ledger.issue_refund(user_id, Money::units(25), OrderId::new(), Utc::now()).await.unwrap();
        assert_eq!(wallet.balance(), Money::units(125));
        assert_eq!(wallet.ledger_balance().unwrap(), wallet.balance());
        assert_eq!(ledger.wallet(user_id).await.unwrap().transactions().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_refund_rejected() {
        let ledger = WalletLedger::new(Arc::new(MemoryStore::new()), Arc::new(RecordingPublisher::default()));
        let user_id = UserId::new();
        let err = ledger.issue_refund(user_id, Money::ZERO, OrderId::new(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidAmount(_)));
        assert!(ledger.wallet(user_id).await.is_err());
    }
}
