use axum::{extract::State, routing::post, Json, Router};
use tracing::{error, info, instrument};

use crate::{
    auth::jwt::AuthUser,
    cards::{dto::AddCardRequest, repo_types::CardView},
    error::ApiError,
    state::AppState,
};

pub fn card_routes() -> Router<AppState> {
    Router::new().route("/credit-cards", post(add_card).get(list_cards))
}

#[instrument(skip(state, payload))]
pub async fn add_card(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddCardRequest>,
) -> Result<Json<CardView>, ApiError> {
    let new_card = payload.into_new_card(user.user_id())?;
    let card = state.cards.create(new_card).await.map_err(|e| {
        error!(error = %e, "create credit card failed");
        ApiError::from(e)
    })?;
    info!(card_id = %card.id, user_id = %card.user_id, "credit card added");
    Ok(Json(card.into()))
}

#[instrument(skip(state))]
pub async fn list_cards(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<CardView>>, ApiError> {
    let cards = state.cards.list_for_user(user.user_id()).await?;
    Ok(Json(cards.into_iter().map(CardView::from).collect()))
}
