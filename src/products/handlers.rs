use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    products::{
        dto::{CreateProductRequest, DeleteProductRequest, UpdateProductRequest},
        repo_types::Product,
    },
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(list_products)
                .post(create_product)
                .put(update_product)
                .delete(delete_product),
        )
        .route("/products/:id", get(get_product))
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.inventory.list().await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    state
        .inventory
        .get(id)
        .await?
        .map(Json)
        .ok_or(ApiError::ProductNotFound)
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.inventory.create(payload.into_fields()?).await?;
    info!(product_id = %product.id, user_id = %user.user_id(), "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let (id, fields) = payload.into_fields()?;
    let product = state
        .inventory
        .update(id, fields)
        .await?
        .ok_or(ApiError::ProductNotFound)?;
    info!(product_id = %id, user_id = %user.user_id(), "product updated");
    Ok(Json(product))
}

#[instrument(skip(state, payload))]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DeleteProductRequest>,
) -> Result<StatusCode, ApiError> {
    if !state.inventory.delete(payload.id).await? {
        return Err(ApiError::ProductNotFound);
    }
    info!(product_id = %payload.id, user_id = %user.user_id(), "product deleted");
    Ok(StatusCode::OK)
}
