use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use sabha_config::Settings;
use sabha_interpreter::{
    AudioEncoding, InterpreterConfig, InterpreterEngine, SpeechSynthesizer, SpeechToText,
    TranscriptHistory, TranslationResult, Translator,
};
use sabha_services::auth::AuthService;
use sabha_services::directory::InMemoryRoomDirectory;
use sabha_services::hub::RoomHub;
use sabha_services::users::UserRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserRegistry>,
    pub rooms: Arc<InMemoryRoomDirectory>,
    pub hub: Arc<RoomHub>,
    pub engine: Arc<InterpreterEngine>,
    pub history: Arc<TranscriptHistory>,
}

impl AppState {
    /// Wires the full application state around the three interpretation
    /// backends. Returns the state plus the engine's result receiver, which
    /// the caller hands to the translation fan-out task.
    pub fn build(
        settings: Settings,
        stt: Arc<dyn SpeechToText>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> (Self, broadcast::Receiver<TranslationResult>) {
        let encoding = AudioEncoding::parse(&settings.interpreter.encoding).unwrap_or_else(|e| {
            warn!(%e, "Falling back to webm chunk encoding");
            AudioEncoding::Webm
        });

        let interpreter_config = InterpreterConfig {
            encoding,
            min_chunk_bytes: settings.interpreter.min_chunk_bytes,
            min_confidence: settings.interpreter.min_confidence,
            detect_override_confidence: settings.interpreter.detect_override_confidence,
            max_concurrent_transcriptions: settings.interpreter.max_concurrent_transcriptions,
            transcription_queue_limit: settings.interpreter.transcription_queue_limit,
            chunk_queue_capacity: settings.interpreter.chunk_queue_capacity,
            chunk_overlap_ms: settings.interpreter.chunk_overlap_ms,
        };

        let (engine, result_rx) =
            InterpreterEngine::new(stt, translator, synthesizer, interpreter_config);

        let state = Self {
            auth: Arc::new(AuthService::new(&settings.auth)),
            users: Arc::new(UserRegistry::new()),
            rooms: Arc::new(InMemoryRoomDirectory::new(&settings.rooms)),
            hub: Arc::new(RoomHub::new(&settings.ws)),
            engine,
            history: Arc::new(TranscriptHistory::new(settings.rooms.history_limit)),
            settings: Arc::new(settings),
        };

        (state, result_rx)
    }
}
