use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    purchases::dto::{BuyForm, PurchaseResponse},
    state::AppState,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn purchase_routes() -> Router<AppState> {
    Router::new().route("/buy", post(buy))
}

#[instrument(skip(state, headers, form))]
pub async fn buy(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Form(form): Form<BuyForm>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let request = form.into_request(idempotency_key)?;
    let purchase = state.purchases.purchase(&user, request).await?;
    Ok(Json(PurchaseResponse {
        status: "purchased",
        replayed: purchase.replayed,
        receipt: purchase.receipt,
    }))
}
