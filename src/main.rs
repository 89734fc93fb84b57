use anyhow::{Context, Result};
use clap::Parser;
use lingua_live::{create_router, AppState, Config, ServiceSet};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "lingua-live", about = "Live language-practice chat service")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/default")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("lingua-live v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Live endpoint: {}", cfg.live.url);

    let services = ServiceSet::gemini(&cfg.ai);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg, services);
    let app = create_router(state);

    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
