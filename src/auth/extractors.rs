use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::jwt::{AuthUser, TokenError, TokenService};
use crate::error::ApiError;

/// The one place bearer tokens are read: the `Authorization` header, either
/// `Bearer <token>` or the bare token.
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                ApiError::TokenInvalid
            })?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .unwrap_or(header)
            .trim();

        let tokens = TokenService::from_ref(state);
        tokens.authenticate(token).map_err(|e| {
            match e {
                TokenError::Expired => debug!("expired token presented"),
                _ => warn!("invalid token presented"),
            }
            ApiError::from(e)
        })
    }
}
