//! Platform lookup via pluggable backends (Apple, Spotify, Google, Audible).
//!
//! Each backend answers "is this podcast on my platform?" for one query and
//! declares up front whether its answer is a plain boolean or a short list of
//! matches. Backends return errors freely; turning an error into the empty
//! verdict is the aggregator's job.

pub mod audible;
pub mod google;
pub mod itunes;
pub mod spotify;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json_path::JsonPath;

use crate::config::AppConfig;
use crate::credentials::{ClientCredentials, TokenCache};
use crate::error::{BackendError, ConfigError, ValidationError};
use crate::similarity::SimilarityScorer;

/// Description used when a platform has none for a match.
pub const NO_DESCRIPTION: &str = "No description available.";

/// Upper bound on matches in a list verdict.
pub const MAX_MATCHES: usize = 3;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A trimmed, non-empty podcast name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// One matching podcast on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastMatch {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// A platform's answer for one query. Serializes as `true`/`false` or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Verdict {
    Found(bool),
    Matches(Vec<PodcastMatch>),
}

impl Verdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            Verdict::Found(_) => VerdictKind::Found,
            Verdict::Matches(_) => VerdictKind::Matches,
        }
    }

    /// True if the platform reported at least one match.
    pub fn is_found(&self) -> bool {
        match self {
            Verdict::Found(found) => *found,
            Verdict::Matches(matches) => !matches.is_empty(),
        }
    }

    /// Cap list verdicts at `max` entries; booleans are unchanged.
    pub fn truncated(self, max: usize) -> Self {
        match self {
            Verdict::Matches(mut matches) => {
                matches.truncate(max);
                Verdict::Matches(matches)
            }
            found => found,
        }
    }
}

/// The verdict shape a backend declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictKind {
    Found,
    Matches,
}

impl VerdictKind {
    /// The "nothing found" verdict of this shape.
    pub fn empty(self) -> Verdict {
        match self {
            VerdictKind::Found => Verdict::Found(false),
            VerdictKind::Matches => Verdict::Matches(Vec::new()),
        }
    }
}

/// A raw result item after field extraction, before matching.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

/// Score candidates against the query and build a verdict of the given kind.
///
/// List verdicts keep candidate order and stop after `max` matches.
pub fn judge<I>(
    kind: VerdictKind,
    scorer: &SimilarityScorer,
    query: &Query,
    candidates: I,
    max: usize,
) -> Verdict
where
    I: IntoIterator<Item = Candidate>,
{
    let mut hits = candidates
        .into_iter()
        .filter(|c| scorer.matches(query.as_str(), &c.title));
    match kind {
        VerdictKind::Found => Verdict::Found(hits.next().is_some()),
        VerdictKind::Matches => Verdict::Matches(
            hits.take(max)
                .map(|c| PodcastMatch {
                    title: c.title,
                    url: c.url,
                    description: c
                        .description
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                })
                .collect(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Backend trait and registry
// ---------------------------------------------------------------------------

/// One platform's search strategy.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Platform name used as the key in aggregate results.
    fn name(&self) -> &str;

    /// Shape of this backend's verdicts; its `empty()` is used on failure.
    fn kind(&self) -> VerdictKind;

    async fn search(&self, query: &Query) -> Result<Verdict, BackendError>;
}

/// Named backends in registration order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend. Names must be unique.
    pub fn register(&mut self, backend: impl Backend + 'static) -> Result<(), ConfigError> {
        self.register_arc(Arc::new(backend))
    }

    pub fn register_arc(&mut self, backend: Arc<dyn Backend>) -> Result<(), ConfigError> {
        if self.backends.iter().any(|b| b.name() == backend.name()) {
            return Err(ConfigError::DuplicateBackend(backend.name().to_string()));
        }
        self.backends.push(backend);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Backend>> {
        self.backends.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.backends.iter().map(|b| b.name())).finish()
    }
}

/// Build the standard platform set from config, in response order:
/// Apple, Spotify, Google, Audible.
pub fn default_registry(
    cfg: &AppConfig,
    http: &reqwest::Client,
) -> Result<BackendRegistry, ConfigError> {
    let scorer = SimilarityScorer::new(cfg.lookup.similarity_threshold)?;
    let max = cfg.lookup.max_matches.min(MAX_MATCHES);

    let tokens = Arc::new(TokenCache::with_margin(
        ClientCredentials::new(
            http.clone(),
            cfg.spotify.token_url.clone(),
            cfg.spotify.client_id.clone(),
            cfg.spotify.client_secret.clone(),
        ),
        cfg.lookup.token_margin(),
    ));

    let mut registry = BackendRegistry::new();
    registry.register(itunes::AppleBackend::new(http.clone(), &cfg.itunes, scorer, max)?)?;
    registry.register(spotify::SpotifyBackend::new(
        http.clone(),
        &cfg.spotify,
        tokens,
        scorer,
        max,
    )?)?;
    registry.register(google::GoogleBackend::new(http.clone(), &cfg.google, scorer)?)?;
    registry.register(audible::AudibleBackend::new(http.clone(), &cfg.audible, scorer, max)?)?;
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Shared helpers for HTTP/JSON backends
// ---------------------------------------------------------------------------

/// Where a platform's JSON keeps its result list and the fields of each item.
#[derive(Debug, Clone)]
pub struct JsonFieldMap {
    items_path: String,
    items: JsonPath,
    title: JsonPath,
    url: JsonPath,
    description: Option<JsonPath>,
}

impl JsonFieldMap {
    /// `items` is queried on the response body; the rest on each item.
    pub fn new(
        items: &str,
        title: &str,
        url: &str,
        description: Option<&str>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            items_path: items.to_string(),
            items: parse_path(items)?,
            title: parse_path(title)?,
            url: parse_path(url)?,
            description: description.map(parse_path).transpose()?,
        })
    }

    /// Extract candidates. A missing result list is an error; items without a
    /// title are skipped.
    pub fn candidates(&self, body: &Value) -> Result<Vec<Candidate>, BackendError> {
        let items = self
            .items
            .query(body)
            .first()
            .and_then(Value::as_array)
            .ok_or_else(|| BackendError::MissingField(self.items_path.clone()))?;

        let text_at = |path: &JsonPath, item: &Value| {
            path.query(item)
                .first()
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Ok(items
            .iter()
            .filter_map(|item| {
                let title = text_at(&self.title, item)?;
                Some(Candidate {
                    title,
                    url: text_at(&self.url, item).unwrap_or_default(),
                    description: self.description.as_ref().and_then(|p| text_at(p, item)),
                })
            })
            .collect())
    }
}

fn parse_path(path: &str) -> Result<JsonPath, ConfigError> {
    JsonPath::parse(path).map_err(|e| ConfigError::InvalidJsonPath {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Send a request and return the body, failing on transport errors and
/// non-success statuses.
pub(crate) async fn fetch_text(
    req: reqwest::RequestBuilder,
    platform: &str,
) -> Result<String, BackendError> {
    let resp = req
        .send()
        .await
        .map_err(|e| BackendError::Network(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            platform: platform.to_string(),
            status: status.as_u16(),
        });
    }
    resp.text()
        .await
        .map_err(|e| BackendError::Network(e.to_string()))
}

pub(crate) async fn fetch_json(
    req: reqwest::RequestBuilder,
    platform: &str,
) -> Result<Value, BackendError> {
    let body = fetch_text(req, platform).await?;
    serde_json::from_str(&body).map_err(|e| BackendError::Parse {
        platform: platform.to_string(),
        message: e.to_string(),
    })
}

/// Join a base URL and a path without doubling or dropping the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn candidate(title: &str) -> Candidate {
        Candidate {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.to_lowercase()),
            description: None,
        }
    }

    #[test]
    fn query_is_trimmed_and_blank_is_rejected() {
        assert_eq!(Query::parse("  Serial \n").unwrap().as_str(), "Serial");
        assert_eq!(Query::parse(""), Err(ValidationError::EmptyQuery));
        assert_eq!(Query::parse(" \t "), Err(ValidationError::EmptyQuery));
    }

    #[test]
    fn verdicts_serialize_as_bool_or_array() {
        assert_eq!(serde_json::to_value(Verdict::Found(true)).unwrap(), json!(true));
        let v = Verdict::Matches(vec![PodcastMatch {
            title: "Serial".into(),
            url: "u".into(),
            description: NO_DESCRIPTION.into(),
        }]);
        assert_eq!(
            serde_json::to_value(v).unwrap(),
            json!([{ "title": "Serial", "url": "u", "description": "No description available." }])
        );
    }

    #[test]
    fn judge_caps_list_verdicts() {
        let q = Query::parse("Serial").unwrap();
        let many = (0..10).map(|_| candidate("Serial"));
        let v = judge(VerdictKind::Matches, &SimilarityScorer::default(), &q, many, MAX_MATCHES);
        match v {
            Verdict::Matches(m) => assert_eq!(m.len(), 3),
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn judge_fills_missing_description() {
        let q = Query::parse("serial").unwrap();
        let mut with_blank = candidate("Serial");
        with_blank.description = Some("  ".into());
        let v = judge(
            VerdictKind::Matches,
            &SimilarityScorer::default(),
            &q,
            [candidate("Serial"), with_blank],
            MAX_MATCHES,
        );
        let Verdict::Matches(m) = v else { panic!("expected list") };
        assert!(m.iter().all(|m| m.description == NO_DESCRIPTION));
    }

    #[test]
    fn judge_boolean_ignores_unrelated() {
        let q = Query::parse("Zzyzx Podcast Nobody Made").unwrap();
        let v = judge(
            VerdictKind::Found,
            &SimilarityScorer::default(),
            &q,
            [candidate("Serial"), candidate("The Daily"), candidate("")],
            MAX_MATCHES,
        );
        assert_eq!(v, Verdict::Found(false));
    }

    #[test]
    fn field_map_extracts_nested_fields() {
        let map = JsonFieldMap::new("$.shows.items", "$.name", "$.external_urls.spotify", Some("$.description")).unwrap();
        let body = json!({
            "shows": { "items": [
                { "name": "Serial", "external_urls": { "spotify": "https://open.spotify.com/show/1" }, "description": "A story" },
                { "external_urls": { "spotify": "https://open.spotify.com/show/2" } },
                { "name": "Other" }
            ]}
        });
        let got = map.candidates(&body).unwrap();
        assert_eq!(
            got,
            vec![
                Candidate {
                    title: "Serial".into(),
                    url: "https://open.spotify.com/show/1".into(),
                    description: Some("A story".into()),
                },
                Candidate {
                    title: "Other".into(),
                    url: String::new(),
                    description: None,
                },
            ]
        );
    }

    #[test]
    fn field_map_missing_list_is_an_error() {
        let map = JsonFieldMap::new("$.results", "$.collectionName", "$.collectionViewUrl", None).unwrap();
        assert_eq!(
            map.candidates(&json!({ "errorMessage": "nope" })),
            Err(BackendError::MissingField("$.results".into()))
        );
    }

    #[test]
    fn invalid_json_path_is_a_config_error() {
        assert!(matches!(
            JsonFieldMap::new("results[", "$.a", "$.b", None),
            Err(ConfigError::InvalidJsonPath { .. })
        ));
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl Backend for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn kind(&self) -> VerdictKind {
            VerdictKind::Found
        }
        async fn search(&self, _query: &Query) -> Result<Verdict, BackendError> {
            Ok(Verdict::Found(true))
        }
    }

    #[test]
    fn registry_keeps_order_and_rejects_duplicates() {
        let mut r = BackendRegistry::new();
        r.register(Fixed("B")).unwrap();
        r.register(Fixed("A")).unwrap();
        assert_eq!(
            r.register(Fixed("B")),
            Err(ConfigError::DuplicateBackend("B".into()))
        );
        assert_eq!(r.names(), vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://x/", "/search"), "http://x/search");
        assert_eq!(join_url("http://x", "search"), "http://x/search");
    }

    #[test]
    fn default_registry_order() {
        let cfg = AppConfig::default();
        let r = default_registry(&cfg, &reqwest::Client::new()).unwrap();
        assert_eq!(r.names(), vec!["Apple", "Spotify", "Google", "Audible"]);
    }
}
