use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::state::AppState;
use sabha_interpreter::TranslationResult;
use sabha_services::hub::ServerEvent;

/// Fans translation results out to their rooms.
///
/// A single task consumes the engine's result channel, so results reach each
/// room's broadcast in exactly the order they were produced. Results whose
/// session has unregistered since the chunk was submitted are discarded:
/// an adapter call that outlives its connection must not speak for it.
pub fn spawn(
    state: AppState,
    mut result_rx: broadcast::Receiver<TranslationResult>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match result_rx.recv().await {
                Ok(result) => {
                    if !state.hub.is_registered(&result.room_code, result.session_id) {
                        debug!(
                            session = %result.session_id,
                            room = %result.room_code,
                            "Result for unregistered session discarded"
                        );
                        continue;
                    }

                    let event = ServerEvent::TranslationResult {
                        user_id: result.user_id,
                        username: result.username.clone(),
                        original_text: result.original_text.clone(),
                        translated_text: result.translated_text.clone(),
                        source_language: result.source_language.clone(),
                        target_language: result.target_language.clone(),
                        audio_url: result.audio_url.clone(),
                        confidence: result.confidence,
                        degraded: result.degraded,
                    };

                    let room_code = result.room_code.clone();
                    state.history.push(result);
                    state.hub.broadcast(&room_code, event);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Translation fan-out lagged, results lost");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Translation fan-out task exited");
    })
}
