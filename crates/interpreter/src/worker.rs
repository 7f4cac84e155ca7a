use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::InterpreterConfig;
use crate::decoder::{self, AudioEncoding, DecodeError};
use crate::stt::SpeechToText;
use crate::translate::Translator;
use crate::tts::SpeechSynthesizer;
use crate::{AudioChunk, TranslationResult};

// 16 kHz mono s16le.
const PCM_BYTES_PER_MS: usize = 32;

/// Per-session pipeline task.
///
/// Consumes the session's chunk channel strictly in order: chunk n+1 does
/// not enter transcription until chunk n's result has been handed to the
/// result channel or the chunk was dropped. Different sessions run their own
/// workers fully in parallel, throttled only by the shared transcription
/// limiter.
pub struct SessionWorker {
    session_id: uuid::Uuid,
    user_id: uuid::Uuid,
    username: String,
    room_code: String,
    stt: Arc<dyn SpeechToText>,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: InterpreterConfig,
    chunk_rx: mpsc::Receiver<AudioChunk>,
    result_tx: broadcast::Sender<TranslationResult>,
    stt_limiter: Arc<Semaphore>,
    stt_queued: Arc<AtomicUsize>,
    overlap_tail: Vec<u8>,
}

/// Keeps the shared waiting-for-transcription count honest even if the
/// worker is aborted mid-acquire.
struct QueueSlot(Arc<AtomicUsize>);

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl SessionWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session_id: uuid::Uuid,
        user_id: uuid::Uuid,
        username: String,
        room_code: String,
        stt: Arc<dyn SpeechToText>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: InterpreterConfig,
        chunk_rx: mpsc::Receiver<AudioChunk>,
        result_tx: broadcast::Sender<TranslationResult>,
        stt_limiter: Arc<Semaphore>,
        stt_queued: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            session_id,
            user_id,
            username,
            room_code,
            stt,
            translator,
            synthesizer,
            config,
            chunk_rx,
            result_tx,
            stt_limiter,
            stt_queued,
            overlap_tail: Vec::new(),
        }
    }

    /// Runs until the chunk channel closes.
    pub async fn run(mut self) {
        info!(
            session = %self.session_id,
            room = %self.room_code,
            speaker = %self.username,
            backend = %self.stt.name(),
            "Interpretation worker started"
        );

        while let Some(chunk) = self.chunk_rx.recv().await {
            self.process(chunk).await;
        }

        debug!(session = %self.session_id, "Interpretation worker stopped");
    }

    async fn process(&mut self, chunk: AudioChunk) {
        let AudioChunk {
            seq,
            bytes,
            source_language,
            target_language,
        } = chunk;

        let bytes = self.stitch_overlap(bytes);

        let audio = match decoder::decode(bytes, self.config.encoding, self.config.min_chunk_bytes)
        {
            Ok(audio) => audio,
            Err(DecodeError::TooSmall(len)) => {
                debug!(seq, bytes = len, "Chunk below minimum size, skipped");
                return;
            }
            Err(e) => {
                warn!(seq, session = %self.session_id, %e, "Undecodable chunk dropped");
                return;
            }
        };

        // Transcription is the expensive stage; hold a shared slot for its
        // duration so a burst of speakers cannot exhaust the host.
        let transcription = {
            let _permit = match self.acquire_stt_slot().await {
                Some(permit) => permit,
                None => {
                    warn!(seq, session = %self.session_id, "Transcription queue full, chunk dropped");
                    return;
                }
            };

            match self.stt.transcribe(&audio, Some(source_language.as_str())).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(seq, session = %self.session_id, %e, "Transcription failed, chunk dropped");
                    return;
                }
            }
        };

        let text = transcription.text.trim();
        if text.is_empty() {
            debug!(seq, "Empty transcription, skipped");
            return;
        }
        if transcription.confidence < self.config.min_confidence {
            debug!(
                seq,
                confidence = transcription.confidence,
                "Low-confidence transcription treated as noise"
            );
            return;
        }

        let (source, target) = resolve_languages(
            &source_language,
            &target_language,
            transcription.language.as_deref(),
            transcription.confidence,
            self.config.detect_override_confidence,
        );

        let (translated_text, degraded) = match self.translator.translate(text, &source, &target).await
        {
            Ok(translated) if !translated.trim().is_empty() => (translated, false),
            Ok(_) => (text.to_string(), true),
            Err(e) => {
                warn!(seq, session = %self.session_id, %e, "Translation failed, passing original text through");
                (text.to_string(), true)
            }
        };

        let audio_url = match self.synthesizer.synthesize(&translated_text, &target).await {
            Ok(url) if !url.is_empty() => Some(url),
            Ok(_) => None,
            Err(e) => {
                warn!(seq, session = %self.session_id, %e, "Synthesis failed, emitting text-only result");
                None
            }
        };

        let result = TranslationResult {
            room_code: self.room_code.clone(),
            session_id: self.session_id,
            user_id: self.user_id,
            username: self.username.clone(),
            original_text: text.to_string(),
            translated_text,
            source_language: source,
            target_language: target,
            audio_url,
            confidence: transcription.confidence,
            degraded,
            created_at: Utc::now(),
        };

        if self.result_tx.send(result).is_err() {
            debug!("No result subscribers");
        }
    }

    async fn acquire_stt_slot(&self) -> Option<tokio::sync::OwnedSemaphorePermit> {
        // The count covers waiters and the acquiring call itself; past the
        // bound the chunk is dropped rather than queued.
        if self.stt_queued.fetch_add(1, Ordering::AcqRel) >= self.config.transcription_queue_limit {
            self.stt_queued.fetch_sub(1, Ordering::AcqRel);
            return None;
        }
        let _slot = QueueSlot(self.stt_queued.clone());
        self.stt_limiter.clone().acquire_owned().await.ok()
    }

    /// Replays the previous chunk's tail ahead of the next one so words cut
    /// at a chunk boundary survive. Only raw PCM can be stitched at the byte
    /// level; container chunks pass through untouched.
    fn stitch_overlap(&mut self, bytes: Vec<u8>) -> Vec<u8> {
        if self.config.chunk_overlap_ms == 0 || self.config.encoding != AudioEncoding::Pcm16 {
            return bytes;
        }

        let tail_len = self.config.chunk_overlap_ms as usize * PCM_BYTES_PER_MS;
        let mut stitched = std::mem::take(&mut self.overlap_tail);
        stitched.extend_from_slice(&bytes);

        let keep = bytes.len().min(tail_len);
        self.overlap_tail = bytes[bytes.len() - keep..].to_vec();
        stitched
    }
}

/// Resolves the effective language pair for one chunk. A confidently
/// detected language overrides the mode's source; if that collides with the
/// target, the target flips so the pair stays bilingual.
fn resolve_languages(
    source: &str,
    target: &str,
    detected: Option<&str>,
    confidence: f64,
    override_threshold: f64,
) -> (String, String) {
    let mut source = source.to_string();
    let mut target = target.to_string();

    if confidence > override_threshold
        && let Some(detected) = detected
    {
        source = normalize_language(detected).to_string();
    }

    if source == target {
        target = if source == "hi" { "en" } else { "hi" }.to_string();
    }

    (source, target)
}

/// Collapses engine-reported language labels onto the bilingual pair.
/// Devanagari-family codes fall back to Hindi.
fn normalize_language(lang: &str) -> &str {
    match lang {
        "english" | "en" => "en",
        "hindi" | "hi" | "mr" | "ne" | "sa" => "hi",
        other => other,
    }
}
