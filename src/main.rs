//! TradeQuest API Server
//!
//! Run with: cargo run --bin tradequest
//!
//! # Configuration
//!
//! Settings come from `TRADEQUEST_CONFIG` when set, otherwise from the
//! default config locations, with `TRADEQUEST_*` environment overrides
//! applied on top. `RUST_LOG` takes precedence over the configured level.

use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tradequest::config::{Config, LoggingConfig};
use tradequest::{api, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("TRADEQUEST_CONFIG") {
        Ok(path) => Config::load_with_env(&PathBuf::from(path))?,
        Err(_) => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting TradeQuest API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.storage.database_path);

    let api_config = config.api.clone();
    let state = AppState::from_config(config).await?;
    let scheduler = state.scheduler.clone();
    let background = state.start_background();

    tracing::info!("Starting server on {}", api_config.addr());
    api::serve(state, &api_config).await?;

    scheduler.stop().await;
    for handle in background {
        handle.abort();
    }

    tracing::info!("TradeQuest API server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("tradequest={},tower_http=info", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
