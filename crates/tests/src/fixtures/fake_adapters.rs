//! Scripted interpretation backends driven by the chunk payload.
//!
//! Tests stream `pcm16` chunks whose bytes are UTF-8 `"text|lang|confidence"`
//! (padded with spaces so the byte count stays even and above the minimum
//! size). That lets every end-to-end test choose the transcription outcome
//! per chunk without a control side-channel. Magic substrings in the text
//! trip stage failures: `FAIL_STT`, `FAIL_TRANSLATE`, `FAIL_TTS`.

use async_trait::async_trait;

use sabha_interpreter::decoder::DecodedAudio;
use sabha_interpreter::{SpeechSynthesizer, SpeechToText, Transcription, Translator};

/// Encodes a scripted transcription into chunk bytes.
pub fn audio_payload(text: &str, lang: &str, confidence: f64) -> Vec<u8> {
    let mut payload = format!("{text}|{lang}|{confidence}");
    while payload.len() < 16 || payload.len() % 2 != 0 {
        payload.push(' ');
    }
    payload.into_bytes()
}

pub struct ScriptedStt;

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(
        &self,
        audio: &DecodedAudio,
        _language_hint: Option<&str>,
    ) -> anyhow::Result<Transcription> {
        let payload = String::from_utf8(audio.bytes.clone()).unwrap_or_default();
        let payload = payload.trim_end();

        let mut parts = payload.rsplitn(3, '|');
        let confidence = parts.next().and_then(|c| c.parse::<f64>().ok());
        let lang = parts.next().map(str::to_string);
        let text = parts.next().unwrap_or_default().to_string();

        if text.contains("FAIL_STT") {
            anyhow::bail!("scripted transcription failure");
        }

        match confidence {
            Some(confidence) => Ok(Transcription {
                text,
                language: lang,
                confidence,
            }),
            // Unscripted noise bytes transcribe to nothing.
            None => Ok(Transcription {
                text: String::new(),
                language: None,
                confidence: 0.0,
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted_stt"
    }
}

pub struct ScriptedTranslate;

#[async_trait]
impl Translator for ScriptedTranslate {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> anyhow::Result<String> {
        if text.contains("FAIL_TRANSLATE") {
            anyhow::bail!("scripted translation failure");
        }
        if text == "नमस्ते" {
            return Ok("Hello".to_string());
        }
        Ok(format!("{text}::{target}"))
    }

    fn name(&self) -> &str {
        "scripted_translate"
    }
}

pub struct ScriptedTts;

#[async_trait]
impl SpeechSynthesizer for ScriptedTts {
    async fn synthesize(&self, text: &str, _language: &str) -> anyhow::Result<String> {
        if text.contains("FAIL_TTS") {
            anyhow::bail!("scripted synthesis failure");
        }
        Ok("/static/audio/test-fixture.mp3".to_string())
    }

    fn name(&self) -> &str {
        "scripted_tts"
    }
}
