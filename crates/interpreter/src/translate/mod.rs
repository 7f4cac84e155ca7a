pub mod remote;

pub use remote::RemoteTranslate;

use async_trait::async_trait;

/// Text-translation capability boundary.
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    /// Translates `text` between two ISO 639-1 language codes.
    async fn translate(&self, text: &str, source: &str, target: &str) -> anyhow::Result<String>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
