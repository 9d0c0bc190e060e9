use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use detect_api::{create_app, AppState, Config, DescriptionLookup, HttpImageFetcher, YoloDetector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::parse();

    let yolo = config.yolo();
    let detector = tokio::task::spawn_blocking(move || YoloDetector::load(&yolo))
        .await
        .context("model loading task failed")??;
    let fetcher = HttpImageFetcher::new().context("failed to build HTTP client")?;

    match config.cors_origins() {
        Some(origins) => tracing::info!("CORS origins: {}", origins.join(", ")),
        None => tracing::info!("CORS: any origin allowed"),
    }

    let state = AppState::new(Arc::new(fetcher), Arc::new(detector), DescriptionLookup::builtin());
    let app = create_app(state, config.cors_layer()?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
