use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use sabha_api::{build_router, state::AppState, ws};
use sabha_config::Settings;
use sabha_interpreter::stt::RemoteWhisper;
use sabha_interpreter::translate::RemoteTranslate;
use sabha_interpreter::tts::RemoteTts;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    tokio::fs::create_dir_all(settings.static_files.audio_dir()).await?;

    let timeout = Duration::from_secs(settings.adapters.request_timeout_secs);
    let stt = Arc::new(RemoteWhisper::new(
        &settings.adapters.whisper_endpoint,
        &settings.adapters.whisper_model,
        timeout,
    )?);
    let translator = Arc::new(RemoteTranslate::new(
        &settings.adapters.translate_endpoint,
        timeout,
    )?);
    let synthesizer = Arc::new(RemoteTts::new(
        &settings.adapters.tts_endpoint,
        settings.static_files.audio_dir(),
        &settings.adapters.tts_voice_en,
        &settings.adapters.tts_voice_hi,
        timeout,
    )?);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let (state, result_rx) = AppState::build(settings, stt, translator, synthesizer);

    ws::forwarder::spawn(state.clone(), result_rx);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "sabha-api listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
