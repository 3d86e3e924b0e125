use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::{auth::token::TokenIdentity, error::AccountError, state::AppState};

/// Extracts and validates the bearer token, yielding the caller's identity.
pub struct AuthUser(pub TokenIdentity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                AccountError::InvalidToken
            })?;

        let identity = state.accounts.tokens().parse_bearer(header)?;
        Ok(AuthUser(identity))
    }
}
