//! Podcast lookup HTTP server.
//!
//! A thin transport over `podcast-finder-core`: validates the requested name,
//! runs one aggregate lookup and returns the per-platform verdicts as JSON.

pub mod api;
pub mod config;

use std::sync::Arc;

use axum::Router;
use podcast_finder_core::aggregate::Aggregator;

use crate::config::ServerConfig;

/// Shared application state (aggregator and config).
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(aggregator: Aggregator, config: ServerConfig) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            config,
        }
    }
}

/// Build API routes with state.
pub fn api_routes(state: AppState) -> Router {
    api::routes(state)
}
