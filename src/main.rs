use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use postcraft::ai::GeminiClient;
use postcraft::compositor::MemeCompositor;
use postcraft::config::{Cli, Config};
use postcraft::db::{self, SqliteStore};
use postcraft::routes;
use postcraft::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    if config.ai.api_key.is_empty() {
        tracing::warn!("No API key configured; generation endpoints will answer 503");
    }
    let backend = GeminiClient::new(&config.ai)?;
    let compositor = MemeCompositor::from_config(&config.compositor)?;

    let state = AppState {
        store: SqliteStore::new(pool),
        config: config.clone(),
        backend: Arc::new(backend),
        compositor: Arc::new(compositor),
    };

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
