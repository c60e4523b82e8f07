//! HTTP surface
//!
//! A thin axum adapter: handlers parse and validate the request, call one
//! service and serialize the result. Errors become `{"error": message}`.

pub mod handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::Services;
use crate::StorefrontError;

impl StorefrontError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorefrontError::NotFound(_) => StatusCode::NOT_FOUND,
            StorefrontError::InvalidStatus(_) | StorefrontError::ValidationFailed(_) | StorefrontError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            StorefrontError::Conflict(_) => StatusCode::CONFLICT,
            StorefrontError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            StorefrontError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

pub fn router(services: Services) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/coupons", post(handlers::create_coupon))
        .route("/api/v1/coupons/validate", post(handlers::validate_coupon))
        .route("/api/v1/coupons/:id", put(handlers::edit_coupon).delete(handlers::delete_coupon))
        .route("/api/v1/coupons/:id/block", post(handlers::block_coupon))
        .route("/api/v1/offers", post(handlers::create_offer))
        .route("/api/v1/offers/:id", delete(handlers::delete_offer))
        .route("/api/v1/products/:id/price", get(handlers::product_price))
        .route("/api/v1/checkout", post(handlers::checkout))
        .route("/api/v1/orders/:id", get(handlers::get_order))
        .route("/api/v1/orders/:id/status", put(handlers::update_status))
        .route("/api/v1/orders/:id/payment", post(handlers::record_payment))
        .route("/api/v1/orders/:id/payment/failed", post(handlers::payment_failed))
        .route("/api/v1/users/:user_id/orders", get(handlers::list_user_orders))
        .route("/api/v1/wallets/:user_id", get(handlers::get_wallet))
        .route("/api/v1/wallets/:user_id/refunds", post(handlers::issue_refund))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}
