use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::Translator;

/// Remote translation backend speaking the LibreTranslate API
/// (`POST /translate`).
pub struct RemoteTranslate {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl RemoteTranslate {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Translator for RemoteTranslate {
    async fn translate(&self, text: &str, source: &str, target: &str) -> anyhow::Result<String> {
        let response: TranslateResponse = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&serde_json::json!({
                "q": text,
                "source": source,
                "target": target,
                "format": "text",
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            source,
            target,
            in_len = text.len(),
            out_len = response.translated_text.len(),
            "Translation complete"
        );

        Ok(response.translated_text)
    }

    fn name(&self) -> &str {
        "remote_translate"
    }
}
