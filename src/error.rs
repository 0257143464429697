use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::jwt::TokenError;
use crate::auth::services::AuthError;
use crate::db::StoreError;
use crate::purchases::payment::PaymentError;
use crate::purchases::services::PurchaseError;

/// Every error a handler can return, each with a stable status and code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("an account with these details already exists")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("product not found")]
    ProductNotFound,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("insufficient stock")]
    InsufficientStock,
    #[error("payment declined")]
    PaymentDeclined,
    /// Transient infrastructure fault. The detail is logged, never sent.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InsufficientStock => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::TokenInvalid | ApiError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::ProductNotFound | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
            ApiError::StoreUnavailable(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::DuplicateEmail => "DUPLICATE_EMAIL",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::TokenInvalid => "TOKEN_INVALID",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::ProductNotFound => "PRODUCT_NOT_FOUND",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InsufficientStock => "INSUFFICIENT_STOCK",
            ApiError::PaymentDeclined => "PAYMENT_DECLINED",
            ApiError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            ApiError::StoreUnavailable(detail) => {
                error!(error = %detail, "store error");
                "service temporarily unavailable".to_string()
            }
            ApiError::Internal(detail) => {
                error!(error = %detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: message,
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::StoreUnavailable(e.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => ApiError::TokenInvalid,
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Signing(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => ApiError::Validation(msg),
            AuthError::DuplicateEmail => ApiError::DuplicateEmail,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::UserNotFound => ApiError::NotFound("user"),
            AuthError::Hash(e) => ApiError::Internal(e.to_string()),
            AuthError::Token(e) => e.into(),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<PurchaseError> for ApiError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::Validation(msg) => ApiError::Validation(msg),
            PurchaseError::ProductNotFound => ApiError::ProductNotFound,
            PurchaseError::InsufficientStock => ApiError::InsufficientStock,
            PurchaseError::Payment(PaymentError::Declined(_)) => ApiError::PaymentDeclined,
            PurchaseError::Payment(e @ PaymentError::Unavailable(_)) => {
                ApiError::StoreUnavailable(e.to_string())
            }
            PurchaseError::Store(e) => e.into(),
        }
    }
}
