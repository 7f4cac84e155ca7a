use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};
use sabha_services::users::User;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    body.validate()?;

    let password_hash = state.auth.hash_password(&body.password)?;
    let user = state
        .users
        .register(body.username, body.email, password_hash)?;

    to_token_response(&state, user)
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&body.username)
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    state.auth.verify_password(&body.password, &user.password_hash)?;

    to_token_response(&state, user)
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .find_by_id(auth.user_id)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(to_user_response(user)))
}

fn to_token_response(state: &AppState, user: User) -> Result<Json<TokenResponse>, ApiError> {
    let access_token = state.auth.issue_access_token(user.id, &user.username)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: to_user_response(user),
    }))
}

fn to_user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        username: user.username,
        email: user.email,
        created_at: user.created_at,
    }
}
