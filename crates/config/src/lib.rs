use serde::{Deserialize, Serialize};

/// Application settings, loaded from (lowest to highest precedence):
/// built-in defaults, an optional `config.toml`, then `SABHA__*` environment
/// variables (`SABHA__SERVER__PORT=9090` overrides `[server] port`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub rooms: RoomSettings,
    #[serde(default)]
    pub ws: WsSettings,
    #[serde(default)]
    pub interpreter: InterpreterSettings,
    #[serde(default)]
    pub adapters: AdapterSettings,
    #[serde(default)]
    pub static_files: StaticSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    pub token_expiry_minutes: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-key-change-in-production".to_string(),
            token_expiry_minutes: 1440,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Default participant capacity when room creation does not specify one.
    pub default_capacity: u32,
    /// Length of the generated room code, excluding the separator
    /// (8 -> `XXXX-XXXX`).
    pub code_length: usize,
    /// Recent translation results retained per room for the messages endpoint.
    pub history_limit: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            default_capacity: 10,
            code_length: 8,
            history_limit: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsSettings {
    /// A session with no inbound or outbound frame for this long is closed
    /// as timed out.
    pub idle_timeout_secs: u64,
    /// Bound of the per-session outbound event queue. When full, the oldest
    /// droppable event is discarded; presence/control events are never
    /// dropped.
    pub outbound_queue_capacity: usize,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            outbound_queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterSettings {
    /// Declared encoding of inbound audio chunks ("webm", "ogg", "wav",
    /// "mp3" or "pcm16"). Negotiated out of band with the client recorder.
    pub encoding: String,
    /// Chunks smaller than this are dropped without error (trailing
    /// silence from the recorder is expected traffic, not a failure).
    pub min_chunk_bytes: usize,
    /// Transcriptions below this confidence are treated as noise and
    /// produce no result.
    pub min_confidence: f64,
    /// A detected language overrides the session mode's source language
    /// when transcription confidence exceeds this threshold.
    pub detect_override_confidence: f64,
    /// Concurrent transcription calls across all sessions.
    pub max_concurrent_transcriptions: usize,
    /// Chunks allowed to wait for a transcription slot before new ones are
    /// dropped.
    pub transcription_queue_limit: usize,
    /// Per-session buffered chunks between the socket reader and the
    /// pipeline worker.
    pub chunk_queue_capacity: usize,
    /// Tail of the previous chunk replayed before the next one, to recover
    /// words cut at chunk boundaries. Only effective for raw pcm16 streams.
    pub chunk_overlap_ms: u64,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            encoding: "webm".to_string(),
            min_chunk_bytes: 100,
            min_confidence: 0.3,
            detect_override_confidence: 0.5,
            max_concurrent_transcriptions: 2,
            transcription_queue_limit: 8,
            chunk_queue_capacity: 32,
            chunk_overlap_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSettings {
    /// OpenAI-compatible Whisper server base URL.
    pub whisper_endpoint: String,
    pub whisper_model: String,
    /// LibreTranslate-compatible base URL.
    pub translate_endpoint: String,
    /// HTTP TTS service base URL.
    pub tts_endpoint: String,
    pub tts_voice_en: String,
    pub tts_voice_hi: String,
    /// Per-call timeout for all three engines, in seconds. A timed-out call
    /// is an adapter failure and degrades per the pipeline rules.
    pub request_timeout_secs: u64,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            whisper_endpoint: "http://127.0.0.1:9000".to_string(),
            whisper_model: "base".to_string(),
            translate_endpoint: "http://127.0.0.1:5000".to_string(),
            tts_endpoint: "http://127.0.0.1:5500".to_string(),
            tts_voice_en: "en-US-AriaNeural".to_string(),
            tts_voice_hi: "hi-IN-SwaraNeural".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticSettings {
    /// Root of the static file tree; synthesized audio lands under
    /// `<static_dir>/audio`.
    pub static_dir: String,
}

impl StaticSettings {
    pub fn audio_dir(&self) -> String {
        format!("{}/audio", self.static_dir)
    }
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            static_dir: "static".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("SABHA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
