pub mod remote;

pub use remote::RemoteTts;

use async_trait::async_trait;

/// Voice-synthesis capability boundary.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesizes `text` in the given language and returns a URL path every
    /// room participant can fetch the audio from.
    async fn synthesize(&self, text: &str, language: &str) -> anyhow::Result<String>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
