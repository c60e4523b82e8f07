//! Repository Module
//!
//! Storage seams for the storefront core. Services hold these as
//! `Arc<dyn ...>` and never see a concrete database client.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::aggregates::{Category, Coupon, Offer, OfferTarget, Order, Product, Wallet, WalletTransaction};
use crate::domain::value_objects::{CategoryId, CouponId, OfferId, OrderId, ProductId, UserId};
use crate::StorefrontError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

impl From<RepoError> for StorefrontError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => StorefrontError::NotFound(what),
            RepoError::Duplicate(what) => StorefrontError::ValidationFailed(format!("{} already exists", what)),
            RepoError::Conflict(what) => StorefrontError::Conflict(what),
            RepoError::Rejected(reason) => StorefrontError::ValidationFailed(reason),
            RepoError::Database(msg) => StorefrontError::StorageError(msg),
        }
    }
}

/// Wallet credit written together with an order change.
#[derive(Clone, Debug, PartialEq)]
pub struct RefundCredit {
    pub user_id: UserId,
    pub transaction: WalletTransaction,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get(&self, id: OrderId) -> RepoResult<Option<Order>>;
    async fn insert(&self, order: &Order) -> RepoResult<()>;
    async fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Order>>;

    /// Stores `order` only if the stored version still equals
    /// `expected_version`, and in the same unit applies `refund` to the
    /// owner's wallet (creating it if needed). Returns the credited wallet.
    async fn commit(&self, order: &Order, expected_version: u64, refund: Option<&RefundCredit>) -> RepoResult<Option<Wallet>>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Wallet>>;

    /// Appends `transaction` and adjusts the balance atomically, opening the
    /// wallet on first use.
    async fn credit(&self, user_id: UserId, transaction: &WalletTransaction) -> RepoResult<Wallet>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn get(&self, id: CouponId) -> RepoResult<Option<Coupon>>;
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Coupon>>;
    /// Fails with `Duplicate` when the code is taken.
    async fn insert(&self, coupon: &Coupon) -> RepoResult<()>;
    async fn save(&self, coupon: &Coupon) -> RepoResult<()>;
    async fn delete(&self, id: CouponId) -> RepoResult<bool>;
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn get(&self, id: OfferId) -> RepoResult<Option<Offer>>;
    async fn insert(&self, offer: &Offer) -> RepoResult<()>;
    async fn save(&self, offer: &Offer) -> RepoResult<()>;
    async fn delete(&self, id: OfferId) -> RepoResult<bool>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn product(&self, id: ProductId) -> RepoResult<Option<Product>>;
    async fn category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    async fn save_product(&self, product: &Product) -> RepoResult<()>;
    async fn save_category(&self, category: &Category) -> RepoResult<()>;

    /// Points the target's offer back-reference at `offer`, returning what
    /// it held before. `NotFound` when the target does not exist.
    async fn set_offer(&self, target: OfferTarget, offer: Option<OfferId>, now: DateTime<Utc>) -> RepoResult<Option<OfferId>>;
}
