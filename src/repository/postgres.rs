//! Postgres store
//!
//! Aggregates are kept as JSONB documents next to the columns that are
//! queried or guarded. Wallet balances are `NUMERIC` and only ever changed
//! with `balance = balance + delta`, and transactions live in their own
//! append-only table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{PgConnection, Row};

use super::{
    CatalogRepository, CouponRepository, OfferRepository, OrderRepository, RefundCredit, RepoError, RepoResult,
    WalletRepository,
};
use crate::domain::aggregates::{
    Category, Coupon, Offer, OfferTarget, Order, Product, TransactionStatus, TransactionType, Wallet, WalletTransaction,
};
use crate::domain::value_objects::{CategoryId, CouponId, Money, OfferId, OrderId, ProductId, TransactionId, UserId};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| RepoError::Database(e.to_string()))
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Duplicate(db.message().to_string()),
            sqlx::Error::Database(db) if db.is_check_violation() => RepoError::Rejected(db.message().to_string()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

fn corrupt(what: impl std::fmt::Display) -> RepoError { RepoError::Database(format!("corrupt row: {}", what)) }

async fn load_wallet(conn: &mut PgConnection, user_id: UserId) -> RepoResult<Option<Wallet>> {
    let head: Option<(Decimal, DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as("SELECT balance, created_at, updated_at FROM wallets WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
    let Some((balance, created_at, updated_at)) = head else { return Ok(None) };

    let rows = sqlx::query(
        "SELECT id, type, amount, date, description, status FROM wallet_transactions WHERE user_id = $1 ORDER BY seq",
    )
    .bind(user_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    let transactions = rows
        .iter()
        .map(|row| -> RepoResult<WalletTransaction> {
            let kind: String = row.try_get("type")?;
            let status: String = row.try_get("status")?;
            Ok(WalletTransaction {
                id: TransactionId::from_uuid(row.try_get("id")?),
                kind: TransactionType::parse(&kind).ok_or_else(|| corrupt(format!("transaction type {}", kind)))?,
                amount: Money::new(row.try_get("amount")?).map_err(corrupt)?,
                date: row.try_get("date")?,
                description: row.try_get("description")?,
                status: TransactionStatus::parse(&status).ok_or_else(|| corrupt(format!("transaction status {}", status)))?,
            })
        })
        .collect::<RepoResult<Vec<_>>>()?;

    let balance = Money::new(balance).map_err(corrupt)?;
    Ok(Some(Wallet::restore(user_id, balance, transactions, created_at, updated_at)))
}

async fn credit_in(conn: &mut PgConnection, user_id: UserId, txn: &WalletTransaction) -> RepoResult<Wallet> {
    let delta = match (txn.status, txn.kind) {
        (TransactionStatus::Completed, TransactionType::Debit) => -txn.amount.amount(),
        (TransactionStatus::Completed, _) => txn.amount.amount(),
        _ => Decimal::ZERO,
    };

    sqlx::query(
        "INSERT INTO wallets (user_id, balance, created_at, updated_at) VALUES ($1, $2, $3, $3) \
         ON CONFLICT (user_id) DO UPDATE SET balance = wallets.balance + EXCLUDED.balance, updated_at = EXCLUDED.updated_at",
    )
    .bind(user_id.as_uuid())
    .bind(delta)
    .bind(txn.date)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "INSERT INTO wallet_transactions (id, user_id, type, amount, date, description, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(txn.id.as_uuid())
    .bind(user_id.as_uuid())
    .bind(txn.kind.as_str())
    .bind(txn.amount.amount())
    .bind(txn.date)
    .bind(&txn.description)
    .bind(txn.status.as_str())
    .execute(&mut *conn)
    .await?;

    load_wallet(conn, user_id).await?.ok_or_else(|| RepoError::NotFound(format!("Wallet {}", user_id)))
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn get(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn insert(&self, order: &Order) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, order_status, payment_status, version, document, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.version() as i64)
        .bind(Json(order))
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Order>> {
        let rows: Vec<(Json<Order>,)> =
            sqlx::query_as("SELECT document FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }

    async fn commit(&self, order: &Order, expected_version: u64, refund: Option<&RefundCredit>) -> RepoResult<Option<Wallet>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE orders SET order_status = $2, payment_status = $3, version = $4, document = $5, updated_at = $6 \
             WHERE id = $1 AND version = $7",
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.version() as i64)
        .bind(Json(order))
        .bind(order.updated_at())
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM orders WHERE id = $1")
                .bind(order.id().as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => RepoError::Conflict(format!("Order {}", order.id())),
                None => RepoError::NotFound(format!("Order {}", order.id())),
            });
        }

        let wallet = match refund {
            Some(credit) => Some(credit_in(&mut *tx, credit.user_id, &credit.transaction).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(wallet)
    }
}

#[async_trait]
impl WalletRepository for PgStore {
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Wallet>> {
        let mut conn = self.pool.acquire().await?;
        load_wallet(&mut *conn, user_id).await
    }

    async fn credit(&self, user_id: UserId, transaction: &WalletTransaction) -> RepoResult<Wallet> {
        let mut tx = self.pool.begin().await?;
        let wallet = credit_in(&mut *tx, user_id, transaction).await?;
        tx.commit().await?;
        Ok(wallet)
    }
}

#[async_trait]
impl CouponRepository for PgStore {
    async fn get(&self, id: CouponId) -> RepoResult<Option<Coupon>> {
        let row: Option<(Json<Coupon>,)> = sqlx::query_as("SELECT document FROM coupons WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(coupon),)| coupon))
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Coupon>> {
        let row: Option<(Json<Coupon>,)> = sqlx::query_as("SELECT document FROM coupons WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(coupon),)| coupon))
    }

    async fn insert(&self, coupon: &Coupon) -> RepoResult<()> {
        sqlx::query("INSERT INTO coupons (id, name, document) VALUES ($1, $2, $3)")
            .bind(coupon.id().as_uuid())
            .bind(coupon.name().as_str())
            .bind(Json(coupon))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save(&self, coupon: &Coupon) -> RepoResult<()> {
        let result = sqlx::query("UPDATE coupons SET name = $2, document = $3 WHERE id = $1")
            .bind(coupon.id().as_uuid())
            .bind(coupon.name().as_str())
            .bind(Json(coupon))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 { return Err(RepoError::NotFound(format!("Coupon {}", coupon.id()))); }
        Ok(())
    }

    async fn delete(&self, id: CouponId) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn target_columns(target: OfferTarget) -> (&'static str, uuid::Uuid) {
    match target {
        OfferTarget::Product(id) => ("product", id.as_uuid()),
        OfferTarget::Category(id) => ("category", id.as_uuid()),
    }
}

#[async_trait]
impl OfferRepository for PgStore {
    async fn get(&self, id: OfferId) -> RepoResult<Option<Offer>> {
        let row: Option<(Json<Offer>,)> = sqlx::query_as("SELECT document FROM offers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(offer),)| offer))
    }

    async fn insert(&self, offer: &Offer) -> RepoResult<()> {
        let (target_type, target_id) = target_columns(offer.target());
        sqlx::query("INSERT INTO offers (id, target_type, target_id, document) VALUES ($1, $2, $3, $4)")
            .bind(offer.id().as_uuid())
            .bind(target_type)
            .bind(target_id)
            .bind(Json(offer))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save(&self, offer: &Offer) -> RepoResult<()> {
        let result = sqlx::query("UPDATE offers SET document = $2 WHERE id = $1")
            .bind(offer.id().as_uuid())
            .bind(Json(offer))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 { return Err(RepoError::NotFound(format!("Offer {}", offer.id()))); }
        Ok(())
    }

    async fn delete(&self, id: OfferId) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM offers WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let row: Option<(Json<Product>,)> = sqlx::query_as("SELECT document FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(product),)| product))
    }

    async fn category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let row: Option<(Json<Category>,)> = sqlx::query_as("SELECT document FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(category),)| category))
    }

    async fn save_product(&self, product: &Product) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO products (id, category_id, document, updated_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (id) DO UPDATE SET category_id = EXCLUDED.category_id, document = EXCLUDED.document, updated_at = NOW()",
        )
        .bind(product.id().as_uuid())
        .bind(product.category_id().as_uuid())
        .bind(Json(product))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_category(&self, category: &Category) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO categories (id, document, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (id) DO UPDATE SET document = EXCLUDED.document, updated_at = NOW()",
        )
        .bind(category.id().as_uuid())
        .bind(Json(category))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_offer(&self, target: OfferTarget, offer: Option<OfferId>, now: DateTime<Utc>) -> RepoResult<Option<OfferId>> {
        let mut tx = self.pool.begin().await?;
        let previous = match target {
            OfferTarget::Product(id) => {
                let row: Option<(Json<Product>,)> = sqlx::query_as("SELECT document FROM products WHERE id = $1 FOR UPDATE")
                    .bind(id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
                let Some((Json(mut product),)) = row else { return Err(RepoError::NotFound(format!("Product {}", id))) };
                let previous = product.offer_id();
                product.set_offer(offer, now);
                sqlx::query("UPDATE products SET document = $2, updated_at = $3 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(Json(&product))
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                previous
            }
            OfferTarget::Category(id) => {
                let row: Option<(Json<Category>,)> = sqlx::query_as("SELECT document FROM categories WHERE id = $1 FOR UPDATE")
                    .bind(id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
                let Some((Json(mut category),)) = row else { return Err(RepoError::NotFound(format!("Category {}", id))) };
                let previous = category.offer_id();
                category.set_offer(offer, now);
                sqlx::query("UPDATE categories SET document = $2, updated_at = $3 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(Json(&category))
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                previous
            }
        };
        tx.commit().await?;
        Ok(previous)
    }
}
