pub mod dto;
pub mod handlers;
pub mod payment;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::purchase_routes()
}
