//! Config file parsing for `~/.config/podcast-finder/config.toml`.
//!
//! Values from the file are overlaid with environment variables by
//! [`AppConfig::apply_env`]; `load_config` does both.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::similarity::DEFAULT_SIMILARITY_THRESHOLD;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub itunes: ItunesConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub audible: AudibleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Minimum title similarity (0.0-1.0) for a result to count as the same podcast.
    pub similarity_threshold: f64,
    /// Deadline for a whole lookup across all platforms.
    pub timeout_secs: u64,
    /// Timeout for a single outbound HTTP request.
    pub request_timeout_secs: u64,
    pub max_matches: usize,
    /// Refresh access tokens this many seconds before they expire.
    pub token_margin_secs: u64,
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            timeout_secs: 12,
            request_timeout_secs: 10,
            max_matches: 3,
            token_margin_secs: 60,
            user_agent: concat!("podcast-finder/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_margin(&self) -> Duration {
        Duration::from_secs(self.token_margin_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItunesConfig {
    pub base_url: String,
    pub limit: u32,
}

impl Default for ItunesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://itunes.apple.com".to_string(),
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: String,
    pub token_url: String,
    pub limit: u32,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base: "https://api.spotify.com".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
    /// Custom Search engine id (`cx`).
    pub cse_id: Option<String>,
    pub api_base: String,
    /// Only results whose link contains this host count.
    pub site: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cse_id: None,
            api_base: "https://www.googleapis.com".to_string(),
            site: "podcasts.google.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudibleConfig {
    pub base_url: String,
    /// CSS selector for result title anchors on the search page.
    pub title_selector: String,
    /// Anchors examined per page.
    pub scan_limit: usize,
}

impl Default for AudibleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.audible.com".to_string(),
            title_selector: "h3 a[href]".to_string(),
            scan_limit: 10,
        }
    }
}

const REDACTED: &str = "********";

impl AppConfig {
    /// Overlay credentials and tuning values from the process environment.
    ///
    /// - `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`
    /// - `GOOGLE_API_KEY`, `GOOGLE_CSE_ID`
    /// - `PODCAST_FINDER_THRESHOLD`, `PODCAST_FINDER_TIMEOUT_SECS`
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = non_empty("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = non_empty("GOOGLE_API_KEY") {
            self.google.api_key = Some(v);
        }
        if let Some(v) = non_empty("GOOGLE_CSE_ID") {
            self.google.cse_id = Some(v);
        }
        if let Some(v) = non_empty("PODCAST_FINDER_THRESHOLD") {
            match v.parse() {
                Ok(t) => self.lookup.similarity_threshold = t,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid PODCAST_FINDER_THRESHOLD"),
            }
        }
        if let Some(v) = non_empty("PODCAST_FINDER_TIMEOUT_SECS") {
            match v.parse() {
                Ok(t) => self.lookup.timeout_secs = t,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid PODCAST_FINDER_TIMEOUT_SECS"),
            }
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        let mut out = self.clone();
        out.spotify.client_secret = mask(&self.spotify.client_secret);
        out.google.api_key = mask(&self.google.api_key);
        out
    }

    /// Shared HTTP client for all platforms.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .user_agent(self.lookup.user_agent.clone())
            .timeout(self.lookup.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }
}

/// Load config from the default path, then apply environment overrides.
/// A missing or unreadable file yields defaults.
pub fn load_config() -> AppConfig {
    let mut cfg = match config_path() {
        Some(path) if path.exists() => load_config_from(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "using default config");
            AppConfig::default()
        }),
        _ => AppConfig::default(),
    };
    cfg.apply_env();
    cfg
}

/// Parse a config file without environment overrides.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
    toml::from_str::<AppConfig>(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("podcast-finder");
        p.push("config.toml");
        p
    })
}
