pub mod remote_whisper;

pub use remote_whisper::RemoteWhisper;

use async_trait::async_trait;

use crate::decoder::DecodedAudio;

/// Recognized speech for one audio chunk.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    /// Detected language (ISO 639-1) when the engine reports one.
    pub language: Option<String>,
    /// 0.0 – 1.0.
    pub confidence: f64,
}

/// Speech-to-text capability boundary.
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribes one decoded chunk. `language_hint` is the session's
    /// configured source language; engines are free to override it via
    /// detection.
    async fn transcribe(
        &self,
        audio: &DecodedAudio,
        language_hint: Option<&str>,
    ) -> anyhow::Result<Transcription>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
