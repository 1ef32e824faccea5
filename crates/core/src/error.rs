/// Rejected before any backend is contacted. The only error a lookup surfaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Podcast name is required")]
    EmptyQuery,
}

/// Client-credentials exchange failures, scoped to the credential cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No client credentials configured")]
    MissingCredentials,

    #[error("Token endpoint unreachable: {0}")]
    Network(String),

    #[error("Token endpoint returned HTTP {status}")]
    Rejected { status: u16 },

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// Per-platform failure. Recovered by the aggregator, never shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{platform} returned HTTP {status}")]
    Status { platform: String, status: u16 },

    #[error("Could not parse {platform} response: {message}")]
    Parse { platform: String, message: String },

    #[error("Response is missing expected field {0}")]
    MissingField(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Similarity threshold {0} is outside 0.0..=1.0")]
    InvalidThreshold(f64),

    #[error("Backend '{0}' is already registered")]
    DuplicateBackend(String),

    #[error("Invalid JSON path '{path}': {message}")]
    InvalidJsonPath { path: String, message: String },

    #[error("Invalid CSS selector '{0}'")]
    InvalidSelector(String),

    #[error("Could not build HTTP client: {0}")]
    HttpClient(String),

    #[error("Invalid config file: {0}")]
    Parse(String),
}
