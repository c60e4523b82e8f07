//! Aggregates module
pub mod cart;
pub mod coupon;
pub mod offer;
pub mod order;
pub mod product;
pub mod wallet;

pub use cart::{Cart, CartError, CartItem};
pub use coupon::{Coupon, CouponDraft, CouponError, CouponType, ListingStatus};
pub use offer::{Offer, OfferDraft, OfferError, OfferTarget};
pub use order::{
    CouponSnapshot, GatewayRef, LineItem, NewOrder, Order, OrderError, OrderStatus, PaymentMethod, PaymentStatus,
    ShippingAddress, StatusChange, VariantSnapshot,
};
pub use product::{Category, Product, ProductStatus, Variant, VariantAttribute};
pub use wallet::{TransactionStatus, TransactionType, Wallet, WalletError, WalletTransaction};
