//! Request bodies and handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::domain::aggregates::{
    Cart, CartItem, Coupon, CouponDraft, CouponType, GatewayRef, Offer, OfferDraft, OfferTarget, Order, PaymentMethod,
    ShippingAddress, Wallet,
};
use crate::domain::value_objects::{CouponCode, CouponId, Money, OfferId, OrderId, Percent, ProductId, UserId, VariantId};
use crate::services::{CouponValidation, DiscountResult, PlaceOrder, Services};
use crate::Result;

pub async fn health() -> Json<Value> { Json(json!({"status": "healthy", "service": "opensase-storefront"})) }

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub coupon_type: CouponType,
    pub offer_price: Money,
    #[serde(default)]
    pub minimum_price: Money,
    pub expire_on: DateTime<Utc>,
}

impl CouponRequest {
    fn into_draft(self) -> Result<CouponDraft> {
        self.validate()?;
        Ok(CouponDraft {
            name: CouponCode::new(&self.name)?,
            coupon_type: self.coupon_type,
            offer_price: self.offer_price,
            minimum_price: self.minimum_price,
            expire_on: self.expire_on,
        })
    }
}

pub async fn create_coupon(State(s): State<Services>, Json(r): Json<CouponRequest>) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = s.coupons.create(r.into_draft()?, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn edit_coupon(State(s): State<Services>, Path(id): Path<CouponId>, Json(r): Json<CouponRequest>) -> Result<Json<Coupon>> {
    Ok(Json(s.coupons.edit(id, r.into_draft()?, Utc::now()).await?))
}

pub async fn block_coupon(State(s): State<Services>, Path(id): Path<CouponId>) -> Result<Json<Coupon>> {
    Ok(Json(s.coupons.block(id, Utc::now()).await?))
}

pub async fn delete_coupon(State(s): State<Services>, Path(id): Path<CouponId>) -> Result<StatusCode> {
    s.coupons.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub cart_subtotal: Money,
}

pub async fn validate_coupon(State(s): State<Services>, Json(r): Json<ValidateCouponRequest>) -> Result<Json<Value>> {
    r.validate()?;
    let body = match s.coupons.validate_coupon(&r.code, r.cart_subtotal, Utc::now()).await? {
        CouponValidation::Valid { coupon, discount } => json!({
            "valid": true,
            "coupon_id": coupon.id(),
            "code": coupon.name(),
            "coupon_type": coupon.coupon_type(),
            "discount": discount,
        }),
        CouponValidation::Invalid { reason } => json!({"valid": false, "reason": reason}),
    };
    Ok(Json(body))
}

// =============================================================================
// Offers and pricing
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    pub target: OfferTarget,
    pub discount_percent: Percent,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

pub async fn create_offer(State(s): State<Services>, Json(r): Json<OfferRequest>) -> Result<(StatusCode, Json<Offer>)> {
    let draft = OfferDraft { target: r.target, discount_percent: r.discount_percent, start_date: r.start_date, end_date: r.end_date };
    let offer = s.offers.create_offer(draft, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

pub async fn delete_offer(State(s): State<Services>, Path(id): Path<OfferId>) -> Result<StatusCode> {
    s.offers.delete_offer(id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PriceParams { pub variant_id: Option<VariantId> }

pub async fn product_price(State(s): State<Services>, Path(id): Path<ProductId>, Query(p): Query<PriceParams>) -> Result<Json<DiscountResult>> {
    Ok(Json(s.pricing.quote_product(id, p.variant_id, Utc::now()).await?))
}

// =============================================================================
// Checkout and orders
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    #[validate(length(min = 1))]
    pub items: Vec<CheckoutItem>,
    pub shipping_address: AddressRequest,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub country: String,
    #[validate(length(min = 1, max = 12))]
    pub pin_code: String,
}

pub async fn checkout(State(s): State<Services>, Json(r): Json<CheckoutRequest>) -> Result<(StatusCode, Json<Order>)> {
    r.validate()?;
    r.shipping_address.validate()?;
    let mut cart = Cart::new(r.user_id);
    for item in r.items {
        item.validate()?;
        cart.add_item(CartItem { product_id: item.product_id, variant_id: item.variant_id, quantity: item.quantity })?;
    }
    let a = r.shipping_address;
    let request = PlaceOrder {
        cart,
        shipping_address: ShippingAddress { address: a.address, city: a.city, state: a.state, country: a.country, pin_code: a.pin_code },
        payment_method: r.payment_method,
        coupon_code: r.coupon_code,
    };
    let order = s.checkout.place_order(request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(State(s): State<Services>, Path(id): Path<OrderId>) -> Result<Json<Order>> {
    Ok(Json(s.orders.get(id).await?))
}

pub async fn list_user_orders(State(s): State<Services>, Path(user_id): Path<UserId>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_for_user(user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest { pub status: String }

pub async fn update_status(State(s): State<Services>, Path(id): Path<OrderId>, Json(r): Json<StatusRequest>) -> Result<Json<Value>> {
    let update = s.orders.update_status(id, &r.status, Utc::now()).await?;
    Ok(Json(json!({"order": update.order, "wallet": update.wallet})))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentRequest {
    #[validate(length(min = 1))]
    pub gateway_order_id: String,
    #[validate(length(min = 1))]
    pub payment_id: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

pub async fn record_payment(State(s): State<Services>, Path(id): Path<OrderId>, Json(r): Json<PaymentRequest>) -> Result<Json<Order>> {
    r.validate()?;
    let gateway_ref = GatewayRef { order_id: r.gateway_order_id, payment_id: r.payment_id, signature: r.signature };
    Ok(Json(s.orders.record_payment(id, gateway_ref, Utc::now()).await?))
}

pub async fn payment_failed(State(s): State<Services>, Path(id): Path<OrderId>) -> Result<Json<Order>> {
    Ok(Json(s.orders.mark_payment_failed(id, Utc::now()).await?))
}

// =============================================================================
// Wallets
// =============================================================================

pub async fn get_wallet(State(s): State<Services>, Path(user_id): Path<UserId>) -> Result<Json<Wallet>> {
    Ok(Json(s.wallet.wallet(user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub order_id: OrderId,
    pub amount: Money,
}

pub async fn issue_refund(State(s): State<Services>, Path(user_id): Path<UserId>, Json(r): Json<RefundRequest>) -> Result<(StatusCode, Json<Wallet>)> {
    let wallet = s.wallet.issue_refund(user_id, r.amount, r.order_id, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}
