use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{SpeechToText, Transcription};
use crate::decoder::DecodedAudio;

/// Remote Whisper backend speaking the OpenAI-compatible transcription API
/// (`POST /v1/audio/transcriptions`, multipart, `verbose_json`).
pub struct RemoteWhisper {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    language: Option<String>,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    avg_logprob: f64,
}

impl RemoteWhisper {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl SpeechToText for RemoteWhisper {
    async fn transcribe(
        &self,
        audio: &DecodedAudio,
        language_hint: Option<&str>,
    ) -> anyhow::Result<Transcription> {
        let file_part = reqwest::multipart::Part::bytes(audio.bytes.clone())
            .file_name(format!("chunk.{}", audio.file_extension()))
            .mime_str(audio.mime())?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(lang) = language_hint {
            form = form.text("language", lang.to_string());
        }

        let response: VerboseTranscription = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.endpoint))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Whisper has no single confidence score; approximate one from the
        // average segment log-probability, clamped into [0, 1].
        let confidence = if response.segments.is_empty() {
            0.0
        } else {
            let avg = response.segments.iter().map(|s| s.avg_logprob).sum::<f64>()
                / response.segments.len() as f64;
            (1.0 + avg).clamp(0.0, 1.0)
        };

        debug!(
            language = ?response.language,
            confidence,
            text_len = response.text.len(),
            "Transcription complete"
        );

        Ok(Transcription {
            text: response.text,
            language: response.language,
            confidence,
        })
    }

    fn name(&self) -> &str {
        "remote_whisper"
    }
}
