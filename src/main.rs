use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsbridge::config::Config;
use newsbridge::fetcher::Aggregator;
use newsbridge::routes::{self, AppState};

const CONFIG_PATH: &str = "newsbridge.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsbridge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if Path::new(CONFIG_PATH).exists() {
        Config::load(CONFIG_PATH)?
    } else {
        info!("No {} found, using built-in feeds", CONFIG_PATH);
        Config::default()
    };
    info!("Configured {} feeds", config.feeds.len());

    let aggregator = Aggregator::from_config(&config)?;
    let app = routes::router(Arc::new(AppState::new(aggregator)));

    let addr = std::env::var("NEWSBRIDGE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
