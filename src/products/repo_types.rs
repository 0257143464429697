use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Product row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Catalog write payload, used for both create and full update.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Record of a committed purchase.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Receipt {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "quantity")]
    pub quantity_purchased: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub purchased_at: OffsetDateTime,
}

/// Input to the atomic stock reservation.
#[derive(Debug, Clone)]
pub struct StockReservation {
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub idempotency_key: Option<String>,
}

/// Result of a reservation attempt. Only `Reserved` changed any state.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationOutcome {
    Reserved(Receipt),
    /// The idempotency key was already used by this user; nothing was decremented.
    Replayed(Receipt),
    InsufficientStock,
    ProductNotFound,
}
