//! In-memory store
//!
//! Implements every repository trait over one lock, so `commit` writes the
//! order and the wallet credit as a single step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    CatalogRepository, CouponRepository, OfferRepository, OrderRepository, RefundCredit, RepoError, RepoResult,
    WalletRepository,
};
use crate::domain::aggregates::{Category, Coupon, Offer, OfferTarget, Order, Product, Wallet, WalletTransaction};
use crate::domain::value_objects::{CategoryId, CouponId, OfferId, OrderId, ProductId, UserId};

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    wallets: HashMap<UserId, Wallet>,
    coupons: HashMap<CouponId, Coupon>,
    offers: HashMap<OfferId, Offer>,
    products: HashMap<ProductId, Product>,
    categories: HashMap<CategoryId, Category>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn stored(order: &Order) -> Order {
    let mut copy = order.clone();
    copy.take_events();
    copy
}

fn credit_wallet(wallets: &mut HashMap<UserId, Wallet>, user_id: UserId, txn: &WalletTransaction) -> RepoResult<Wallet> {
    let mut wallet = wallets.get(&user_id).cloned().unwrap_or_else(|| Wallet::open(user_id, txn.date));
    wallet.append(txn.clone()).map_err(|e| RepoError::Rejected(e.to_string()))?;
    wallets.insert(user_id, wallet.clone());
    Ok(wallet)
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn get(&self, id: OrderId) -> RepoResult<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn insert(&self, order: &Order) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.orders.contains_key(&order.id()) { return Err(RepoError::Duplicate(format!("Order {}", order.id()))); }
        state.orders.insert(order.id(), stored(order));
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().filter(|o| o.user_id() == user_id).cloned().collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at()));
        Ok(orders)
    }

    async fn commit(&self, order: &Order, expected_version: u64, refund: Option<&RefundCredit>) -> RepoResult<Option<Wallet>> {
        let mut state = self.state.write().await;
        let current = state.orders.get(&order.id()).ok_or_else(|| RepoError::NotFound(format!("Order {}", order.id())))?;
        if current.version() != expected_version { return Err(RepoError::Conflict(format!("Order {}", order.id()))); }

        let wallet = match refund {
            Some(credit) => Some(credit_wallet(&mut state.wallets, credit.user_id, &credit.transaction)?),
            None => None,
        };
        state.orders.insert(order.id(), stored(order));
        Ok(wallet)
    }
}

#[async_trait]
impl WalletRepository for MemoryStore {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Wallet>> {
        Ok(self.state.read().await.wallets.get(&user_id).cloned())
    }

    async fn credit(&self, user_id: UserId, transaction: &WalletTransaction) -> RepoResult<Wallet> {
        let mut state = self.state.write().await;
        credit_wallet(&mut state.wallets, user_id, transaction)
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn get(&self, id: CouponId) -> RepoResult<Option<Coupon>> {
        Ok(self.state.read().await.coupons.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Coupon>> {
        Ok(self.state.read().await.coupons.values().find(|c| c.name().as_str() == name).cloned())
    }

    async fn insert(&self, coupon: &Coupon) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.coupons.values().any(|c| c.name() == coupon.name()) {
            return Err(RepoError::Duplicate(format!("Coupon {}", coupon.name())));
        }
        state.coupons.insert(coupon.id(), coupon.clone());
        Ok(())
    }

    async fn save(&self, coupon: &Coupon) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.coupons.values().any(|c| c.id() != coupon.id() && c.name() == coupon.name()) {
            return Err(RepoError::Duplicate(format!("Coupon {}", coupon.name())));
        }
        if !state.coupons.contains_key(&coupon.id()) { return Err(RepoError::NotFound(format!("Coupon {}", coupon.id()))); }
        state.coupons.insert(coupon.id(), coupon.clone());
        Ok(())
    }

    async fn delete(&self, id: CouponId) -> RepoResult<bool> {
        Ok(self.state.write().await.coupons.remove(&id).is_some())
    }
}

#[async_trait]
impl OfferRepository for MemoryStore {
    async fn get(&self, id: OfferId) -> RepoResult<Option<Offer>> {
        Ok(self.state.read().await.offers.get(&id).cloned())
    }

    async fn insert(&self, offer: &Offer) -> RepoResult<()> {
        self.state.write().await.offers.insert(offer.id(), offer.clone());
        Ok(())
    }

    async fn save(&self, offer: &Offer) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if !state.offers.contains_key(&offer.id()) { return Err(RepoError::NotFound(format!("Offer {}", offer.id()))); }
        state.offers.insert(offer.id(), offer.clone());
        Ok(())
    }

    async fn delete(&self, id: OfferId) -> RepoResult<bool> {
        Ok(self.state.write().await.offers.remove(&id).is_some())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn save_product(&self, product: &Product) -> RepoResult<()> {
        self.state.write().await.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn save_category(&self, category: &Category) -> RepoResult<()> {
        self.state.write().await.categories.insert(category.id(), category.clone());
        Ok(())
    }

    async fn set_offer(&self, target: OfferTarget, offer: Option<OfferId>, now: DateTime<Utc>) -> RepoResult<Option<OfferId>> {
        let mut state = self.state.write().await;
        match target {
            OfferTarget::Product(id) => {
                let product = state.products.get_mut(&id).ok_or_else(|| RepoError::NotFound(format!("Product {}", id)))?;
                let previous = product.offer_id();
                product.set_offer(offer, now);
                Ok(previous)
            }
            OfferTarget::Category(id) => {
                let category = state.categories.get_mut(&id).ok_or_else(|| RepoError::NotFound(format!("Category {}", id)))?;
                let previous = category.offer_id();
                category.set_offer(offer, now);
                Ok(previous)
            }
        }
    }
}
