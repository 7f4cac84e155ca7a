use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};
use sabha_services::directory::{RoomRecord, RoomStatus};
use sabha_services::hub::{LanguageMode, ParticipantInfo};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub max_participants: Option<u32>,
    pub language_mode: Option<LanguageMode>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub language_mode: Option<LanguageMode>,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub code: String,
    pub name: String,
    pub owner_id: String,
    pub capacity: u32,
    pub status: RoomStatus,
    pub participant_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub user_id: String,
    pub username: String,
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub audio_url: Option<String>,
    pub confidence: f64,
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    body.validate()?;

    let room = state.rooms.create_room(
        auth.user_id,
        body.name,
        body.max_participants,
        body.language_mode.unwrap_or(LanguageMode::HiToEn),
    );

    Ok(Json(to_response(&state, room)))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<RoomResponse>>, ApiError> {
    let rooms = state.rooms.rooms_for_user(auth.user_id);
    let response = rooms
        .into_iter()
        .map(|room| to_response(&state, room))
        .collect();

    Ok(Json(response))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(room_code): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state.rooms.find(&room_code)?;
    Ok(Json(to_response(&state, room)))
}

pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_code): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state.rooms.join(
        &room_code,
        auth.user_id,
        body.language_mode.unwrap_or(LanguageMode::HiToEn),
    )?;

    Ok(Json(to_response(&state, room)))
}

pub async fn leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_code): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.rooms.leave(&room_code, auth.user_id)?;
    Ok(Json(serde_json::json!({ "left": true })))
}

/// Ends the room: the directory marks it ended, the hub discards its live
/// state (open sockets drain and hang up) and the transcript buffer is
/// dropped.
pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_code): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.rooms.end_room(&room_code, auth.user_id)?;
    state.hub.close_room(&room_code);
    state.history.clear(&room_code);

    Ok(Json(serde_json::json!({ "ended": true })))
}

pub async fn participants(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(room_code): Path<String>,
) -> Result<Json<Vec<ParticipantInfo>>, ApiError> {
    state.rooms.find(&room_code)?;
    Ok(Json(state.hub.snapshot(&room_code)))
}

pub async fn messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_code): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    state.rooms.find(&room_code)?;
    if !state.rooms.is_member(&room_code, auth.user_id) {
        return Err(ApiError::Forbidden("Not a room member".to_string()));
    }

    let messages = state
        .history
        .recent(&room_code)
        .into_iter()
        .map(|r| MessageResponse {
            user_id: r.user_id.to_string(),
            username: r.username,
            original_text: r.original_text,
            translated_text: r.translated_text,
            source_language: r.source_language,
            target_language: r.target_language,
            audio_url: r.audio_url,
            confidence: r.confidence,
            degraded: r.degraded,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(messages))
}

fn to_response(state: &AppState, room: RoomRecord) -> RoomResponse {
    RoomResponse {
        participant_count: state.hub.session_count(&room.code),
        code: room.code,
        name: room.name,
        owner_id: room.owner_id.to_string(),
        capacity: room.capacity,
        status: room.status,
        created_at: room.created_at,
    }
}
