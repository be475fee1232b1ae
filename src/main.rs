use std::error::Error;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use story_refiner::adapters::{
    build_router, InMemorySessionStore, JsonFileSettingsRepository, MockAiTransport,
    OpenAiAssistantsConfig, OpenAiAssistantsTransport,
};
use story_refiner::application::RefinementOrchestrator;
use story_refiner::config::{AiConfig, AiProvider, AppConfig};
use story_refiner::ports::{AiTransport, SettingsRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate()?;

    let transport = build_transport(&config.ai)?;
    let settings: Arc<dyn SettingsRepository> =
        Arc::new(JsonFileSettingsRepository::new(&config.settings.path));
    let orchestrator = Arc::new(RefinementOrchestrator::new(
        Arc::new(InMemorySessionStore::new()),
        transport,
        Arc::clone(&settings),
    ));

    let app = build_router(orchestrator, settings, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        environment = ?config.server.environment,
        provider = ?config.ai.provider,
        settings = %config.settings.path.display(),
        "Story refiner listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn build_transport(ai: &AiConfig) -> Result<Arc<dyn AiTransport>, Box<dyn Error>> {
    match ai.provider {
        AiProvider::Mock => {
            tracing::warn!("Using the mock AI transport; replies are empty JSON arrays");
            Ok(Arc::new(MockAiTransport::new()))
        }
        AiProvider::OpenAI => {
            let key = ai
                .openai_api_key
                .as_ref()
                .map(|k| k.expose_secret().clone())
                .unwrap_or_default();

            let mut transport_config = OpenAiAssistantsConfig::new(key)
                .with_model(&ai.model)
                .with_base_url(&ai.base_url)
                .with_timeout(ai.timeout())
                .with_max_retries(ai.max_retries)
                .with_assistant_name(&ai.assistant_name)
                .with_polling(ai.poll_interval(), ai.max_poll_interval())
                .with_run_timeout(ai.run_timeout());
            if let Some(id) = &ai.assistant_id {
                transport_config = transport_config.with_assistant_id(id);
            }

            Ok(Arc::new(OpenAiAssistantsTransport::new(transport_config)?))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
