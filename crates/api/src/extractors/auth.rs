use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use sabha_services::auth::TokenVerifier;

/// Identity extracted from the `Authorization: Bearer <token>` header.
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let identity = state.auth.validate_token(token)?;

        Ok(AuthUser {
            user_id: identity.user_id,
            username: identity.username,
        })
    }
}
