//! Stagewright server binary.
//!
//! Loads configuration from the environment, wires the provider and archive
//! adapters into the pipeline, and serves the invoke API.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stagewright::adapters::ai::{AnthropicConfig, AnthropicProvider, OpenAIConfig, OpenAIProvider};
use stagewright::adapters::archive::{InMemoryTurnArchive, PostgresTurnArchive};
use stagewright::adapters::http::{app_router, AppState};
use stagewright::application::PipelineService;
use stagewright::config::{AppConfig, InferenceService};
use stagewright::ports::{AIProvider, TurnArchive};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let provider = build_provider(&config)?;
    info!(
        provider = %provider.provider_info().name,
        model = %provider.provider_info().model,
        "generation provider ready"
    );

    let archive = build_archive(&config).await;

    let pipeline = Arc::new(PipelineService::new(
        provider,
        archive,
        &config.pipeline,
        config.ai.max_tokens,
    ));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    let router = app_router(AppState::new(pipeline), config.server.request_timeout());
    axum::serve(listener, router).await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    if config.server.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn AIProvider>, Box<dyn std::error::Error>> {
    // Validation guarantees the key is present.
    let api_key = config.ai.api_key.clone().unwrap_or_default();

    let provider: Arc<dyn AIProvider> = match config.ai.service {
        InferenceService::Anthropic => Arc::new(AnthropicProvider::new(
            AnthropicConfig::new(api_key)
                .with_model(config.ai.model.clone())
                .with_base_url(config.ai.effective_base_url())
                .with_timeout(config.ai.timeout()),
        )?),
        service => {
            let name = match service {
                InferenceService::OpenAi => "openai",
                InferenceService::Groq => "groq",
                InferenceService::OpenRouter => "openrouter",
                InferenceService::DeepSeek => "deepseek",
                InferenceService::Anthropic => unreachable!(),
            };
            Arc::new(OpenAIProvider::new(
                OpenAIConfig::new(api_key)
                    .with_model(config.ai.model.clone())
                    .with_base_url(config.ai.effective_base_url())
                    .with_service_name(name)
                    .with_timeout(config.ai.timeout()),
            )?)
        }
    };
    Ok(provider)
}

/// Builds the turn archive. Archive problems never stop the server: a failed
/// database connection degrades to the in-memory archive.
async fn build_archive(config: &AppConfig) -> Arc<dyn TurnArchive> {
    let Some(url) = config.database.url.as_deref().filter(|u| !u.is_empty()) else {
        info!("no database configured; turn archive is in-memory only");
        return Arc::new(InMemoryTurnArchive::new());
    };

    match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
    {
        Ok(pool) => {
            let archive = PostgresTurnArchive::new(pool);
            if let Err(err) = archive.ensure_schema().await {
                warn!(%err, "failed to prepare archive schema; archiving in memory");
                return Arc::new(InMemoryTurnArchive::new());
            }
            info!("turn archive connected to postgres");
            Arc::new(archive)
        }
        Err(err) => {
            warn!(%err, "failed to connect to database; archiving in memory");
            Arc::new(InMemoryTurnArchive::new())
        }
    }
}
