//! Checkout
//!
//! Turns a cart into a placed order. Every line is priced against the catalog
//! at checkout time, with the best running offer applied, and the variant is
//! copied into the order so later catalog edits do not change it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::aggregates::{Cart, LineItem, NewOrder, Order, PaymentMethod, ShippingAddress, VariantSnapshot};
use crate::repository::OrderRepository;
use crate::services::coupons::CouponService;
use crate::services::discount::PricingService;
use crate::services::publisher::EventPublisher;
use crate::{Result, StorefrontError};

#[derive(Clone, Debug)]
pub struct PlaceOrder {
    pub cart: Cart,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

#[derive(Clone)]
pub struct Checkout {
    pricing: PricingService,
    coupons: CouponService,
    orders: Arc<dyn OrderRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl Checkout {
    pub fn new(pricing: PricingService, coupons: CouponService, orders: Arc<dyn OrderRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { pricing, coupons, orders, publisher }
    }

    #[instrument(skip(self, request), fields(user_id = %request.cart.user_id(), items = request.cart.item_count()))]
    pub async fn place_order(&self, request: PlaceOrder, now: DateTime<Utc>) -> Result<Order> {
        if request.cart.is_empty() {
            return Err(StorefrontError::ValidationFailed("Cart is empty".into()));
        }

        let mut lines = Vec::with_capacity(request.cart.item_count());
        for item in request.cart.items() {
            let product = self.pricing.load_product(item.product_id).await?;
            if !product.is_listed() {
                return Err(StorefrontError::ValidationFailed(format!("Product {} is not available", product.name())));
            }
            let variant = product.variant(item.variant_id).ok_or_else(|| StorefrontError::NotFound(format!("Variant {}", item.variant_id)))?;
            let quote = self.pricing.quote(&product, Some(variant.id), now).await?;
            lines.push(LineItem {
                product_id: product.id(),
                variant_id: variant.id,
                quantity: item.quantity,
                unit_price: quote.discounted_price,
                variant: VariantSnapshot { name: variant.name.clone(), price: variant.price, attributes: variant.attributes.clone() },
            });
        }

        let subtotal = LineItem::subtotal(&lines)?;
        let coupon = match request.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(self.coupons.validate_coupon(code, subtotal, now).await?.into_coupon()?.snapshot(subtotal)),
            None => None,
        };

        let mut order = Order::place(
            NewOrder {
                user_id: request.cart.user_id(),
                lines,
                shipping_address: request.shipping_address,
                payment_method: request.payment_method,
                coupon,
            },
            now,
        )?;
        self.orders.insert(&order).await?;
        info!(order_id = %order.id(), total = %order.total_amount(), final_amount = %order.final_amount(), "Order placed");
        self.publisher.publish(order.take_events()).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::coupon::tests::draft;
    use crate::domain::aggregates::offer::tests::running_offer;
    use crate::domain::aggregates::{CartItem, Category, CouponType, OfferTarget, OrderStatus, PaymentStatus, Product, Variant};
    use crate::domain::events::{DomainEvent, OrderEvent};
    use crate::domain::value_objects::{Money, ProductId, UserId, VariantId};
    use crate::repository::{CatalogRepository, MemoryStore, OfferRepository};
    use crate::services::publisher::tests::RecordingPublisher;

    struct Fixture {
        store: Arc<MemoryStore>,
        publisher: Arc<RecordingPublisher>,
        coupons: CouponService,
        checkout: Checkout,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let coupons = CouponService::new(store.clone());
        let checkout = Checkout::new(PricingService::new(store.clone(), store.clone()), coupons.clone(), store.clone(), publisher.clone());
        Fixture { store, publisher, coupons, checkout }
    }

    /// A listed product with one variant priced at `price`.
    async fn product(f: &Fixture, price: u32) -> (Product, VariantId) {
        let now = Utc::now();
        let category = Category::create("Bags", now);
        let mut product = Product::create("Tote", category.id(), Money::units(price), now);
        let variant_id = VariantId::new();
        product.add_variant(Variant { id: variant_id, name: "Canvas".into(), price: Money::units(price), attributes: vec![] }, now);
        f.store.save_category(&category).await.unwrap();
        f.store.save_product(&product).await.unwrap();
        (product, variant_id)
    }

    fn request(user_id: UserId, items: &[(ProductId, VariantId, u32)], coupon_code: Option<&str>) -> PlaceOrder {
        let mut cart = Cart::new(user_id);
        for (product_id, variant_id, quantity) in items {
            cart.add_item(CartItem { product_id: *product_id, variant_id: *variant_id, quantity: *quantity }).unwrap();
        }
        PlaceOrder { cart, shipping_address: ShippingAddress::default(), payment_method: PaymentMethod::OnlineGateway, coupon_code: coupon_code.map(String::from) }
    }

    #[tokio::test]
    async fn test_place_order_applies_offer_and_coupon() {
        let f = fixture();
        let now = Utc::now();
        let (product, variant_id) = product(&f, 200).await;
        let offer = running_offer(OfferTarget::Product(product.id()), 25, now);
        OfferRepository::insert(f.store.as_ref(), &offer).await.unwrap();
        f.store.set_offer(offer.target(), Some(offer.id()), now).await.unwrap();
        f.coupons.create(draft("WELCOME", CouponType::Fixed, 50, 100, now), now).await.unwrap();

        let order = f.checkout.place_order(request(UserId::new(), &[(product.id(), variant_id, 2)], Some(" WELCOME ")), now).await.unwrap();
        assert_eq!(order.products()[0].unit_price, Money::units(150));
        assert_eq!(order.products()[0].variant.price, Money::units(200));
        assert_eq!(order.total_amount(), Money::units(300));
        assert_eq!(order.discount_amount(), Money::units(50));
        assert_eq!(order.final_amount(), Money::units(250));
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert!(OrderRepository::get(f.store.as_ref(), order.id()).await.unwrap().is_some());
        assert!(matches!(f.publisher.events().as_slice(), [DomainEvent::Order(OrderEvent::Placed { .. })]));
    }

    #[tokio::test]
    async fn test_invalid_coupon_blocks_checkout() {
        let f = fixture();
        let now = Utc::now();
        let (product, variant_id) = product(&f, 40).await;
        f.coupons.create(draft("BIGSPEND", CouponType::Percentage, 10, 1000, now), now).await.unwrap();

        let err = f.checkout.place_order(request(UserId::new(), &[(product.id(), variant_id, 1)], Some("BIGSPEND")), now).await.unwrap_err();
        assert!(matches!(err, StorefrontError::ValidationFailed(reason) if reason.contains("1000")));
        let err = f.checkout.place_order(request(UserId::new(), &[(product.id(), variant_id, 1)], Some("NOPE")), now).await.unwrap_err();
        assert!(matches!(err, StorefrontError::ValidationFailed(_)));
        assert!(f.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_and_unknown_items() {
        let f = fixture();
        let now = Utc::now();
        assert!(matches!(f.checkout.place_order(request(UserId::new(), &[], None), now).await, Err(StorefrontError::ValidationFailed(_))));

        let (product, _) = product(&f, 10).await;
        let missing_variant = request(UserId::new(), &[(product.id(), VariantId::new(), 1)], None);
        assert!(matches!(f.checkout.place_order(missing_variant, now).await, Err(StorefrontError::NotFound(_))));
        let missing_product = request(UserId::new(), &[(ProductId::new(), VariantId::new(), 1)], None);
        assert!(matches!(f.checkout.place_order(missing_product, now).await, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unlisted_product_cannot_be_ordered() {
        let f = fixture();
        let now = Utc::now();
        let (mut product, variant_id) = product(&f, 10).await;
        product.unlist(now);
        f.store.save_product(&product).await.unwrap();
        let err = f.checkout.place_order(request(UserId::new(), &[(product.id(), variant_id, 1)], None), now).await.unwrap_err();
        assert!(matches!(err, StorefrontError::ValidationFailed(_)));
    }
}
