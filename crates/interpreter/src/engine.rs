use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use dashmap::DashMap;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::InterpreterConfig;
use crate::stt::SpeechToText;
use crate::translate::Translator;
use crate::tts::SpeechSynthesizer;
use crate::worker::SessionWorker;
use crate::{AudioChunk, TranslationResult};

struct PipelineHandle {
    chunk_tx: mpsc::Sender<AudioChunk>,
    abort_handle: tokio::task::AbortHandle,
}

/// Orchestrates per-session interpretation pipelines.
///
/// Created once at startup and shared via `Arc`. Each registered session
/// gets a dedicated sequential worker; results from every worker funnel into
/// one broadcast channel, which is the single enqueue point that fixes the
/// per-room delivery order of `translation_result` events.
pub struct InterpreterEngine {
    stt: Arc<dyn SpeechToText>,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: InterpreterConfig,
    pipelines: DashMap<Uuid, PipelineHandle>,
    result_tx: broadcast::Sender<TranslationResult>,
    stt_limiter: Arc<Semaphore>,
    stt_queued: Arc<AtomicUsize>,
}

impl InterpreterEngine {
    /// Returns `(engine, result_receiver)`.
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: InterpreterConfig,
    ) -> (Arc<Self>, broadcast::Receiver<TranslationResult>) {
        let (result_tx, result_rx) = broadcast::channel(256);

        info!(
            stt = %stt.name(),
            translator = %translator.name(),
            synthesizer = %synthesizer.name(),
            max_concurrent_transcriptions = config.max_concurrent_transcriptions,
            "Interpreter engine created"
        );

        let engine = Arc::new(Self {
            stt,
            translator,
            synthesizer,
            stt_limiter: Arc::new(Semaphore::new(config.max_concurrent_transcriptions)),
            stt_queued: Arc::new(AtomicUsize::new(0)),
            config,
            pipelines: DashMap::new(),
            result_tx,
        });

        (engine, result_rx)
    }

    /// Returns a new receiver for translation results.
    pub fn subscribe(&self) -> broadcast::Receiver<TranslationResult> {
        self.result_tx.subscribe()
    }

    /// Starts the pipeline for a session. An existing pipeline for the same
    /// session is stopped first (reconnects reuse the session slot).
    pub fn start_session(
        self: &Arc<Self>,
        session_id: Uuid,
        user_id: Uuid,
        username: String,
        room_code: String,
    ) {
        if self.pipelines.contains_key(&session_id) {
            info!(session = %session_id, "Replacing existing pipeline");
            self.stop_session(session_id);
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(self.config.chunk_queue_capacity);

        let worker = SessionWorker::new(
            session_id,
            user_id,
            username,
            room_code,
            self.stt.clone(),
            self.translator.clone(),
            self.synthesizer.clone(),
            self.config.clone(),
            chunk_rx,
            self.result_tx.clone(),
            self.stt_limiter.clone(),
            self.stt_queued.clone(),
        );

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            worker.run().await;
            // Natural exit (chunk channel closed): drop the registry entry.
            engine.pipelines.remove(&session_id);
            debug!(session = %session_id, "Pipeline entry cleaned up");
        });

        self.pipelines.insert(
            session_id,
            PipelineHandle {
                chunk_tx,
                abort_handle: handle.abort_handle(),
            },
        );
    }

    /// Hands a chunk to the session's pipeline without blocking the caller.
    /// A full per-session buffer drops the chunk (the socket reader must
    /// never stall behind a slow pipeline).
    pub fn submit_chunk(&self, session_id: Uuid, chunk: AudioChunk) {
        let Some(handle) = self.pipelines.get(&session_id) else {
            debug!(session = %session_id, "Chunk for unknown session dropped");
            return;
        };

        match handle.chunk_tx.try_send(chunk) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(chunk)) => {
                warn!(
                    session = %session_id,
                    seq = chunk.seq,
                    "Session pipeline backlog full, chunk dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session = %session_id, "Chunk for closing session dropped");
            }
        }
    }

    /// Cancels a session's pipeline: queued-but-unstarted chunks are
    /// discarded and any in-flight stage is aborted. Idempotent.
    pub fn stop_session(&self, session_id: Uuid) {
        if let Some((_, handle)) = self.pipelines.remove(&session_id) {
            handle.abort_handle.abort();
            debug!(session = %session_id, "Pipeline stopped");
        }
    }

    /// Number of live session pipelines.
    pub fn active_pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}
