//! OpenSASE Storefront
//!
//! Order lifecycle, wallet refunds and discount resolution for the
//! self-hosted storefront.
//!
//! ## Features
//! - Offer resolution (best of product and category offers)
//! - Coupon validation and administration
//! - Checkout into `Processing` orders with snapshotted lines and coupon
//! - Order status state machine with wallet refunds
//! - Append-only per-user wallet ledger
//!
//! Storage is reached only through the traits in [`repository`]; the core
//! never talks to a database client directly.

pub mod api;
pub mod config;
pub mod domain;
pub mod repository;
pub mod services;

use thiserror::Error;

use crate::domain::aggregates::OrderStatus;

pub use crate::services::Services;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{0} was modified concurrently, reload and retry")]
    Conflict(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
