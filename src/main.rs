mod adapters;
mod commands;
mod config;
mod domain;
mod error;
mod pipeline;
mod ports;

use adapters::services::auth::FirebaseAuthService;
use adapters::services::knowledge::SnowflakeService;
use adapters::services::llm::GoogleService;
use adapters::services::ocr::GoogleVisionService;
use adapters::services::tts::ElevenLabsService;
use adapters::session::SessionCache;
use adapters::storage::SqliteStorage;
use config::AppConfig;
use error::Result;
use pipeline::ProcessingPipeline;
use ports::{AuthPort, KnowledgePort, LlmServicePort, OcrServicePort, StoragePort, TtsServicePort};
use std::sync::Arc;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProcessingPipeline>,
    pub sessions: Arc<SessionCache>,
    pub storage: Arc<dyn StoragePort>,
    pub auth: Arc<dyn AuthPort>,
    pub max_upload_bytes: usize,
}

/// Initialize the application
///
/// Opens the database, runs migrations and builds every service adapter.
fn initialize_app(config: &AppConfig) -> Result<AppState> {
    // Initialize SQLite database
    let storage = Arc::new(SqliteStorage::new(&config.database_path)?);
    storage.run_migrations()?;
    log::info!("Database ready at {}", config.database_path);

    let llm = GoogleService::new(config.gemini.api_key.clone().unwrap_or_default())?;
    let ocr = GoogleVisionService::new(
        config.vision.api_key.clone().unwrap_or_default(),
        config.vision.max_pages,
    )?;
    let tts = ElevenLabsService::new(&config.elevenlabs)?;
    let auth = FirebaseAuthService::new(config.firebase_web_api_key.clone().unwrap_or_default())?;

    let knowledge: Arc<dyn KnowledgePort> = match &config.snowflake {
        Some(snowflake) => Arc::new(SnowflakeService::new(snowflake.clone())?),
        None => storage.clone(),
    };

    for (name, configured) in [
        ("LLM (GEMINI_API_KEY)", llm.is_configured()),
        ("OCR (GOOGLE_VISION_API_KEY)", ocr.is_configured()),
        ("Speech (ELEVENLABS_API_KEY)", tts.is_configured()),
        ("Auth (FIREBASE_WEB_API_KEY)", auth.is_configured()),
    ] {
        if !configured {
            log::warn!("{} not configured", name);
        }
    }
    log::info!(
        "Knowledge source: {}, normalize mode: {}",
        knowledge.source_name(),
        config.normalize_mode
    );

    let pipeline = ProcessingPipeline::new(
        Arc::new(ocr),
        Arc::new(llm),
        Arc::new(tts),
        config.gemini.llm.clone(),
    )
    .with_knowledge(knowledge)
    .with_mode(config.normalize_mode);

    Ok(AppState {
        pipeline: Arc::new(pipeline),
        sessions: Arc::new(SessionCache::new(config.session_capacity, config.session_ttl)?),
        storage,
        auth: Arc::new(auth),
        max_upload_bytes: config.max_upload_bytes,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    log::debug!("Loaded configuration: {:?}", config);

    let state = initialize_app(&config)?;
    let app = commands::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.bind_addr, e))?;

    log::info!(
        "ClariMed v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
