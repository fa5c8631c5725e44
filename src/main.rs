use std::sync::Arc;

use code_chat_backend::api::GeminiClient;
use code_chat_backend::config::AppConfig;
use code_chat_backend::server::{self, AppState};
use code_chat_backend::session::SessionStore;
use code_chat_backend::storage::TranscriptStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = AppConfig::load()?;

    // The upload directory must exist before the first request; failing to
    // create it is fatal, unlike everything else below.
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!("scratch uploads go to {:?}", config.upload_dir);

    if config.api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY is not set; Gemini calls will fail until it is");
    }

    let transcripts = match config.transcript_db {
        Some(ref path) => match TranscriptStore::open(path) {
            Ok(store) => {
                tracing::info!("transcript mirror at {:?}", path);
                Some(Arc::new(store))
            }
            Err(err) => {
                tracing::warn!(
                    "transcript store at {:?} unavailable ({}), continuing without mirror",
                    path,
                    err
                );
                None
            }
        },
        None => None,
    };

    let model = Arc::new(GeminiClient::from_config(&config));
    let sessions = Arc::new(SessionStore::new(
        config.max_history_length,
        transcripts.clone(),
    ));

    let state = AppState {
        config: Arc::new(config),
        model,
        sessions,
        transcripts,
    };

    server::run(state).await
}
