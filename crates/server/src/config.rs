//! Server configuration (bind address).

/// Configuration for the HTTP server. Lookup settings come from the core config.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host:port to bind (e.g. "127.0.0.1:3000" or "0.0.0.0:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Build config from environment (and defaults).
    /// - `PODCAST_FINDER_BIND`: host:port, takes precedence
    /// - `PORT`: listen on `0.0.0.0:$PORT` (platform-assigned port)
    pub fn from_env() -> Self {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut c = Self::default();
        if let Some(b) = get("PODCAST_FINDER_BIND").filter(|b| !b.is_empty()) {
            c.bind = b;
        } else if let Some(port) = get("PORT").and_then(|p| p.parse::<u16>().ok()) {
            c.bind = format!("0.0.0.0:{}", port);
        }
        c
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind
    }
}
