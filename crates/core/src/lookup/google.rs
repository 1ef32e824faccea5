//! Google Podcasts presence via the Custom Search JSON API.
//!
//! Custom Search returns page titles such as `"Serial - Google Podcasts"`, so
//! titles are cut at the first separator before scoring. Only results on the
//! configured site count.

use async_trait::async_trait;

use crate::config::GoogleConfig;
use crate::error::{BackendError, ConfigError};
use crate::lookup::{
    fetch_json, join_url, judge, Backend, Candidate, JsonFieldMap, Query, Verdict, VerdictKind,
};
use crate::similarity::SimilarityScorer;

const PLATFORM: &str = "Google";
const TITLE_SEPARATORS: &[&str] = &[" - ", " | ", " – "];

pub struct GoogleBackend {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    cse_id: Option<String>,
    site: String,
    fields: JsonFieldMap,
    scorer: SimilarityScorer,
}

impl GoogleBackend {
    pub fn new(
        http: reqwest::Client,
        cfg: &GoogleConfig,
        scorer: SimilarityScorer,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            api_base: cfg.api_base.clone(),
            api_key: cfg.api_key.clone(),
            cse_id: cfg.cse_id.clone(),
            site: cfg.site.clone(),
            fields: JsonFieldMap::new("$.items", "$.title", "$.link", Some("$.snippet"))?,
            scorer,
        })
    }

    fn on_site(&self, c: &Candidate) -> bool {
        self.site.is_empty() || c.url.contains(&self.site)
    }
}

/// `"Serial - Google Podcasts"` -> `"Serial"`.
fn page_title(title: &str) -> &str {
    TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .map_or(title, |idx| &title[..idx])
        .trim()
}

#[async_trait]
impl Backend for GoogleBackend {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn kind(&self) -> VerdictKind {
        VerdictKind::Found
    }

    async fn search(&self, query: &Query) -> Result<Verdict, BackendError> {
        let (key, cx) = match (self.api_key.as_deref(), self.cse_id.as_deref()) {
            (Some(key), Some(cx)) => (key, cx),
            _ => return Err(BackendError::NotConfigured("Google Custom Search".to_string())),
        };
        let req = self
            .http
            .get(join_url(&self.api_base, "customsearch/v1"))
            .query(&[("q", query.as_str()), ("cx", cx), ("key", key)]);
        let body = fetch_json(req, PLATFORM).await?;

        // No `items` key means zero hits, not a malformed response.
        if body.get("items").is_none() {
            return Ok(self.kind().empty());
        }
        let candidates = self
            .fields
            .candidates(&body)?
            .into_iter()
            .filter(|c| self.on_site(c))
            .map(|c| Candidate {
                title: page_title(&c.title).to_string(),
                ..c
            });
        Ok(judge(self.kind(), &self.scorer, query, candidates, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer, configured: bool) -> GoogleBackend {
        let cfg = GoogleConfig {
            api_key: configured.then(|| "key".to_string()),
            cse_id: configured.then(|| "engine".to_string()),
            api_base: server.uri(),
            ..GoogleConfig::default()
        };
        GoogleBackend::new(reqwest::Client::new(), &cfg, SimilarityScorer::default()).unwrap()
    }

    #[test]
    fn page_title_strips_site_suffix() {
        assert_eq!(page_title("Serial - Google Podcasts"), "Serial");
        assert_eq!(page_title("Serial | Podcast on Spotify - x"), "Serial");
        assert_eq!(page_title("Serial"), "Serial");
    }

    #[tokio::test]
    async fn found_only_for_matching_title_on_site() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "Serial"))
            .and(query_param("cx", "engine"))
            .and(query_param("key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "title": "Serial - Wikipedia", "link": "https://en.wikipedia.org/wiki/Serial_(podcast)" },
                    { "title": "Serial - Google Podcasts", "link": "https://podcasts.google.com/feed/abc" }
                ]
            })))
            .mount(&server)
            .await;

        let v = backend(&server, true).search(&Query::parse("Serial").unwrap()).await.unwrap();
        assert_eq!(v, Verdict::Found(true));
    }

    #[tokio::test]
    async fn off_site_results_do_not_count() {
        let server = MockServer::start().await;
        Mock::given(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "title": "Serial - Wikipedia", "link": "https://en.wikipedia.org/wiki/Serial" }]
            })))
            .mount(&server)
            .await;

        let v = backend(&server, true).search(&Query::parse("Serial").unwrap()).await.unwrap();
        assert_eq!(v, Verdict::Found(false));
    }

    #[tokio::test]
    async fn zero_hits_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "searchInformation": { "totalResults": "0" }
            })))
            .mount(&server)
            .await;

        let v = backend(&server, true).search(&Query::parse("Serial").unwrap()).await.unwrap();
        assert_eq!(v, Verdict::Found(false));
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = backend(&server, false)
            .search(&Query::parse("Serial").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured(_)));
    }
}
