//! Binary entry point for the podcast lookup server.

use podcast_finder_core::aggregate::Aggregator;
use podcast_finder_core::config::load_config;
use podcast_finder_server::{api_routes, config::ServerConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("podcast_finder_server=info,podcast_finder_core=info,tower_http=info")
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = load_config();
    let aggregator = Aggregator::from_config(&cfg)?;
    if cfg.spotify.client_id.is_none() || cfg.spotify.client_secret.is_none() {
        tracing::warn!("Spotify credentials not set; Spotify lookups will report no matches");
    }
    if cfg.google.api_key.is_none() || cfg.google.cse_id.is_none() {
        tracing::warn!("Google Custom Search not configured; Google lookups will report false");
    }

    let state = AppState::new(aggregator, ServerConfig::from_env());
    let app = api_routes(state.clone())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(platforms = ?state.aggregator.platforms(), "Podcast finder listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
