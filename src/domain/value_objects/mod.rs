//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::StorefrontError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn from_uuid(id: Uuid) -> Self { Self(id) }
            pub fn as_uuid(&self) -> Uuid { self.0 }
        }

        impl Default for $name {
            fn default() -> Self { Self::new() }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
        }
    };
}

entity_id!(OrderId);
entity_id!(UserId);
entity_id!(ProductId);
entity_id!(VariantId);
entity_id!(CategoryId);
entity_id!(CouponId);
entity_id!(OfferId);
entity_id!(#[doc = "Wallet ledger entry id"] TransactionId);

/// Non-negative amount of money in the store currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(MoneyError::Negative(amount)); }
        Ok(Self(amount.normalize()))
    }
    /// Whole currency units, e.g. `Money::units(1200)`.
    pub fn units(value: u32) -> Self { Self(Decimal::from(value)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn add(&self, other: Money) -> Result<Money, MoneyError> {
        self.0.checked_add(other.0).map(Money).ok_or(MoneyError::Overflow)
    }
    /// Subtraction floored at zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        if other.0 >= self.0 { Money::ZERO } else { Money(self.0 - other.0) }
    }
    pub fn multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        self.0.checked_mul(Decimal::from(qty)).map(Money).ok_or(MoneyError::Overflow)
    }
    /// `pct` of this amount. The factor is at most one, so the result never
    /// exceeds `self`.
    pub fn percent(&self, pct: Percent) -> Money { Money(self.0 * pct.fraction()) }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Money::new(value) }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self { value.0 }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone)] pub enum MoneyError { Negative(Decimal), Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative(v) => write!(f, "Amount cannot be negative: {}", v),
            Self::Overflow => write!(f, "Amount is too large"),
        }
    }
}

impl From<MoneyError> for StorefrontError {
    fn from(err: MoneyError) -> Self { StorefrontError::InvalidAmount(err.to_string()) }
}

/// Percentage in `[0, 100]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, PercentError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED { return Err(PercentError::OutOfRange(value)); }
        Ok(Self(value.normalize()))
    }
    pub fn whole(value: u8) -> Result<Self, PercentError> { Self::new(Decimal::from(value)) }
    pub fn value(&self) -> Decimal { self.0 }
    pub fn fraction(&self) -> Decimal { self.0 / Decimal::ONE_HUNDRED }
}

impl TryFrom<Decimal> for Percent {
    type Error = PercentError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Percent::new(value) }
}

impl From<Percent> for Decimal {
    fn from(value: Percent) -> Self { value.0 }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}%", self.0) }
}

#[derive(Debug, Clone)] pub enum PercentError { OutOfRange(Decimal) }
impl std::error::Error for PercentError {}
impl fmt::Display for PercentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::OutOfRange(v) => write!(f, "Discount percent must be between 0 and 100, got {}", v) }
    }
}

impl From<PercentError> for StorefrontError {
    fn from(err: PercentError) -> Self { StorefrontError::ValidationFailed(err.to_string()) }
}

/// Coupon code as typed by the customer. Matched exactly, only surrounding
/// whitespace is dropped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: impl Into<String>) -> Result<Self, CouponCodeError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(CouponCodeError::Empty); }
        if value.len() > 50 { return Err(CouponCodeError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { CouponCode::new(value) }
}

impl From<CouponCode> for String {
    fn from(value: CouponCode) -> Self { value.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone)] pub enum CouponCodeError { Empty, TooLong }
impl std::error::Error for CouponCodeError {}
impl fmt::Display for CouponCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Coupon code empty"), Self::TooLong => write!(f, "Coupon code too long") }
    }
}

impl From<CouponCodeError> for StorefrontError {
    fn from(err: CouponCodeError) -> Self { StorefrontError::ValidationFailed(err.to_string()) }
}
