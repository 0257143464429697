use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::products::repo_types::ProductFields;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct DeleteProductRequest {
    pub id: Uuid,
}

/// Prices are stored as NUMERIC(12,2).
const PRICE_SCALE: u32 = 2;
const MAX_PRICE_EXCLUSIVE: i64 = 10_000_000_000;

fn validated(
    name: String,
    description: Option<String>,
    price: Decimal,
    quantity: i32,
) -> Result<ProductFields, ApiError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if price.is_sign_negative() {
        return Err(ApiError::Validation("price must not be negative".into()));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(ApiError::Validation(
            "price must have at most 2 decimal places".into(),
        ));
    }
    if price >= Decimal::from(MAX_PRICE_EXCLUSIVE) {
        return Err(ApiError::Validation("price is too large".into()));
    }
    if quantity < 0 {
        return Err(ApiError::Validation("quantity must not be negative".into()));
    }
    Ok(ProductFields {
        name,
        description: description.filter(|d| !d.trim().is_empty()),
        price,
        quantity,
    })
}

impl CreateProductRequest {
    pub fn into_fields(self) -> Result<ProductFields, ApiError> {
        validated(self.name, self.description, self.price, self.quantity)
    }
}

impl UpdateProductRequest {
    pub fn into_fields(self) -> Result<(Uuid, ProductFields), ApiError> {
        let id = self.id;
        Ok((id, validated(self.name, self.description, self.price, self.quantity)?))
    }
}
