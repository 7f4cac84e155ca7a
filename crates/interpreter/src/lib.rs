pub mod config;
pub mod decoder;
pub mod engine;
pub mod history;
pub mod stt;
pub mod translate;
pub mod tts;
pub mod worker;

pub use config::InterpreterConfig;
pub use decoder::{AudioEncoding, DecodeError, DecodedAudio};
pub use engine::InterpreterEngine;
pub use history::TranscriptHistory;
pub use stt::{SpeechToText, Transcription};
pub use translate::Translator;
pub use tts::SpeechSynthesizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sequenced unit of streamed speech audio from a single session.
///
/// The sequence number is assigned by the connection supervisor and is
/// monotone per session; the language pair is the session's mode at the
/// moment the chunk arrived. Chunks are transient: consumed once by the
/// pipeline and never retained past the processing window.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub seq: u64,
    pub bytes: Vec<u8>,
    pub source_language: String,
    pub target_language: String,
}

/// Output of one pipeline run, broadcast to the originating room.
/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub room_code: String,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub audio_url: Option<String>,
    pub confidence: f64,
    /// True when translation failed and `translated_text` carries the
    /// original text unchanged.
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}
