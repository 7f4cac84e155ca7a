use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::LanguageMode;

/// One row of a presence snapshot, in room join order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub user_id: Uuid,
    pub username: String,
    pub language_mode: LanguageMode,
}

/// Events delivered to clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ConnectionEstablished {
        user_id: Uuid,
        username: String,
        room_code: String,
        language_mode: LanguageMode,
        participants: Vec<ParticipantInfo>,
    },
    UserJoined {
        user_id: Uuid,
        username: String,
        participants: Vec<ParticipantInfo>,
    },
    UserLeft {
        user_id: Uuid,
        username: String,
        participants: Vec<ParticipantInfo>,
    },
    TranslationResult {
        user_id: Uuid,
        username: String,
        original_text: String,
        translated_text: String,
        source_language: String,
        target_language: String,
        audio_url: Option<String>,
        confidence: f64,
        degraded: bool,
    },
    ModeChanged {
        user_id: Uuid,
        mode: LanguageMode,
        participants: Vec<ParticipantInfo>,
    },
    Pong,
}

impl ServerEvent {
    /// Presence and control events must never be dropped from a full
    /// outbound queue; translation results may be.
    pub fn is_critical(&self) -> bool {
        !matches!(self, ServerEvent::TranslationResult { .. })
    }
}

/// Control messages received from clients. Unknown `type` values map to
/// `Unknown` and are ignored without closing the connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ChangeMode { mode: LanguageMode },
    Ping,
    #[serde(other)]
    Unknown,
}
