//! Wallet Aggregate
//!
//! Append-only store-credit ledger, one per user. `balance` always equals the
//! completed credit-like entries minus the completed debits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_objects::{Money, OrderId, TransactionId, UserId};
use crate::StorefrontError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wallet {
    user_id: UserId,
    balance: Money,
    transactions: Vec<WalletTransaction>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub description: String,
    pub status: TransactionStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType { Credit, Debit, Refund, Gateway }

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Credit => "credit", Self::Debit => "debit", Self::Refund => "refund", Self::Gateway => "gateway" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s { "credit" => Some(Self::Credit), "debit" => Some(Self::Debit), "refund" => Some(Self::Refund), "gateway" => Some(Self::Gateway), _ => None }
    }

    pub fn is_debit(&self) -> bool { matches!(self, Self::Debit) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus { Pending, Completed, Failed }

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Completed => "completed", Self::Failed => "failed" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s { "pending" => Some(Self::Pending), "completed" => Some(Self::Completed), "failed" => Some(Self::Failed), _ => None }
    }
}

impl WalletTransaction {
    /// Completed refund credit for `order_id`.
    pub fn refund(amount: Money, order_id: OrderId, now: DateTime<Utc>) -> Result<Self, WalletError> {
        if amount.is_zero() { return Err(WalletError::InvalidAmount); }
        Ok(Self {
            id: TransactionId::new(), kind: TransactionType::Refund, amount, date: now,
            description: format!("Refund for order {}", order_id), status: TransactionStatus::Completed,
        })
    }

    /// Signed effect on the balance once the entry is recorded.
    fn balance_effect(&self) -> (Money, bool) {
        if self.status != TransactionStatus::Completed { return (Money::ZERO, false); }
        (self.amount, self.kind.is_debit())
    }
}

impl Wallet {
    pub fn open(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self { user_id, balance: Money::ZERO, transactions: vec![], created_at: now, updated_at: now }
    }

    /// Rebuilds a wallet from stored rows.
    pub fn restore(user_id: UserId, balance: Money, transactions: Vec<WalletTransaction>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self { user_id, balance, transactions, created_at, updated_at }
    }

    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn balance(&self) -> Money { self.balance }
    pub fn transactions(&self) -> &[WalletTransaction] { &self.transactions }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn append(&mut self, txn: WalletTransaction) -> Result<(), WalletError> {
        if txn.amount.is_zero() { return Err(WalletError::InvalidAmount); }
        let (amount, debit) = txn.balance_effect();
        if debit {
            if amount > self.balance { return Err(WalletError::InsufficientBalance); }
            self.balance = self.balance.saturating_sub(amount);
        } else {
            self.balance = self.balance.add(amount).map_err(|_| WalletError::BalanceOverflow)?;
        }
        self.updated_at = txn.date;
        self.transactions.push(txn);
        Ok(())
    }

    /// Balance recomputed from the ledger entries.
    pub fn ledger_balance(&self) -> Result<Money, WalletError> {
        self.transactions.iter().try_fold(Money::ZERO, |acc, t| match t.balance_effect() {
            (amount, true) => Ok(acc.saturating_sub(amount)),
            (amount, false) => acc.add(amount).map_err(|_| WalletError::BalanceOverflow),
        })
    }
}

#[derive(Debug, Clone)] pub enum WalletError { InvalidAmount, InsufficientBalance, BalanceOverflow }
impl std::error::Error for WalletError {}
impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount => write!(f, "Amount must be greater than zero"),
            Self::InsufficientBalance => write!(f, "Insufficient wallet balance"),
            Self::BalanceOverflow => write!(f, "Wallet balance is too large"),
        }
    }
}

impl From<WalletError> for StorefrontError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidAmount | WalletError::BalanceOverflow => StorefrontError::InvalidAmount(err.to_string()),
            WalletError::InsufficientBalance => StorefrontError::ValidationFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_entry() {
        let order_id = OrderId::new();
        let txn = WalletTransaction::refund(Money::units(1200), order_id, Utc::now()).unwrap();
        assert_eq!(txn.kind, TransactionType::Refund);
        assert_eq!(txn.status, TransactionStatus::Completed);
        assert_eq!(txn.description, format!("Refund for order {}", order_id));
        assert!(matches!(WalletTransaction::refund(Money::ZERO, order_id, Utc::now()), Err(WalletError::InvalidAmount)));
    }

    #[test]
    fn test_balance_matches_ledger() {
        let now = Utc::now();
        let mut wallet = Wallet::open(UserId::new(), now);
        wallet.append(WalletTransaction::refund(Money::units(100), OrderId::new(), now).unwrap()).unwrap();
        wallet.append(WalletTransaction::refund(Money::units(50), OrderId::new(), now).unwrap()).unwrap();
        let pending = WalletTransaction { status: TransactionStatus::Pending, ..WalletTransaction::refund(Money::units(70), OrderId::new(), now).unwrap() };
        wallet.append(pending).unwrap();
        let debit = WalletTransaction { kind: TransactionType::Debit, description: "Order payment".into(), ..WalletTransaction::refund(Money::units(30), OrderId::new(), now).unwrap() };
        wallet.append(debit).unwrap();
        assert_eq!(wallet.balance(), Money::units(120));
        assert_eq!(wallet.ledger_balance().unwrap(), wallet.balance());
        assert_eq!(wallet.transactions().len(), 4);
    }

    #[test]
    fn test_credit_past_max_balance_is_rejected() {
        let now = Utc::now();
        let mut wallet = Wallet::open(UserId::new(), now);
        let max = Money::new(rust_decimal::Decimal::MAX).unwrap();
        wallet.append(WalletTransaction::refund(max, OrderId::new(), now).unwrap()).unwrap();
        let err = wallet.append(WalletTransaction::refund(Money::units(1), OrderId::new(), now).unwrap());
        assert!(matches!(err, Err(WalletError::BalanceOverflow)));
        assert_eq!(wallet.balance(), max);
        assert_eq!(wallet.transactions().len(), 1);
    }

    #[test]
    fn test_debit_cannot_overdraw() {
        let now = Utc::now();
        let mut wallet = Wallet::open(UserId::new(), now);
        let debit = WalletTransaction { kind: TransactionType::Debit, ..WalletTransaction::refund(Money::units(1), OrderId::new(), now).unwrap() };
        assert!(matches!(wallet.append(debit), Err(WalletError::InsufficientBalance)));
        assert!(wallet.transactions().is_empty());
    }
}
