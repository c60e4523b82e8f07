//! Cart Aggregate

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ProductId, UserId, VariantId};

/// A customer's cart. Prices are not stored here; checkout prices every line
/// against the catalog and current offers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self { Self { user_id, items: vec![] } }

    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id && i.variant_id == item.variant_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)] pub enum CartError { InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::InvalidQuantity => write!(f, "Quantity must be at least 1") }
    }
}

impl From<CartError> for crate::StorefrontError {
    fn from(err: CartError) -> Self { crate::StorefrontError::ValidationFailed(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new(UserId::new());
        let (pid, vid) = (ProductId::new(), VariantId::new());
        cart.add_item(CartItem { product_id: pid, variant_id: vid, quantity: 2 }).unwrap();
        cart.add_item(CartItem { product_id: pid, variant_id: vid, quantity: 1 }).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        cart.add_item(CartItem { product_id: pid, variant_id: VariantId::new(), quantity: 1 }).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert!(!cart.is_empty());
    }
    #[test]
    fn test_cart_rejects_zero_quantity() {
        let mut cart = Cart::new(UserId::new());
        assert!(matches!(cart.add_item(CartItem { product_id: ProductId::new(), variant_id: VariantId::new(), quantity: 0 }), Err(CartError::InvalidQuantity)));
    }
}
