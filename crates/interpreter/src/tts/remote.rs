use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::SpeechSynthesizer;

/// Remote TTS backend: posts text + voice to an HTTP synthesis service,
/// writes the returned MP3 under the static audio directory and hands back
/// the `/static/audio/...` path clients fetch it from.
pub struct RemoteTts {
    client: reqwest::Client,
    endpoint: String,
    audio_dir: PathBuf,
    voice_en: String,
    voice_hi: String,
}

impl RemoteTts {
    pub fn new(
        endpoint: &str,
        audio_dir: impl Into<PathBuf>,
        voice_en: &str,
        voice_hi: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            audio_dir: audio_dir.into(),
            voice_en: voice_en.to_string(),
            voice_hi: voice_hi.to_string(),
        })
    }

    fn voice_for(&self, language: &str) -> &str {
        match language {
            "hi" => &self.voice_hi,
            _ => &self.voice_en,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for RemoteTts {
    async fn synthesize(&self, text: &str, language: &str) -> anyhow::Result<String> {
        let voice = self.voice_for(language);

        let audio = self
            .client
            .post(format!("{}/synthesize", self.endpoint))
            .json(&serde_json::json!({ "text": text, "voice": voice }))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let filename = format!("{}.mp3", Uuid::new_v4().simple());
        tokio::fs::create_dir_all(&self.audio_dir).await?;
        tokio::fs::write(self.audio_dir.join(&filename), &audio).await?;

        let url = format!("/static/audio/{filename}");
        debug!(%url, language, voice, bytes = audio.len(), "TTS generated");
        Ok(url)
    }

    fn name(&self) -> &str {
        "remote_tts"
    }
}
