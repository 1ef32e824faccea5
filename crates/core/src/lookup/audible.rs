//! Audible podcast search, scraped from the public search page.
//!
//! Best effort: Audible has no public catalog API, so candidates are pulled
//! from the result markup with a CSS selector. When the page layout changes
//! the selector simply finds nothing and the verdict is empty.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::AudibleConfig;
use crate::error::{BackendError, ConfigError};
use crate::lookup::{fetch_text, join_url, judge, Backend, Candidate, Query, Verdict, VerdictKind};
use crate::similarity::SimilarityScorer;

const PLATFORM: &str = "Audible";

pub struct AudibleBackend {
    http: reqwest::Client,
    base_url: String,
    titles: Selector,
    scan_limit: usize,
    scorer: SimilarityScorer,
    max_matches: usize,
}

impl AudibleBackend {
    pub fn new(
        http: reqwest::Client,
        cfg: &AudibleConfig,
        scorer: SimilarityScorer,
        max_matches: usize,
    ) -> Result<Self, ConfigError> {
        let titles = Selector::parse(&cfg.title_selector)
            .map_err(|_| ConfigError::InvalidSelector(cfg.title_selector.clone()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            titles,
            scan_limit: cfg.scan_limit,
            scorer,
            max_matches,
        })
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            join_url(&self.base_url, href)
        }
    }
}

/// Pull up to `limit` title anchors out of a search page.
fn scan_page(page: &str, titles: &Selector, limit: usize) -> Vec<(String, String)> {
    let doc = Html::parse_document(page);
    doc.select(titles)
        .filter_map(|a| {
            let text = a.text().collect::<Vec<_>>().join(" ");
            let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let href = a.value().attr("href")?;
            (!title.is_empty()).then(|| (title, href.to_string()))
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl Backend for AudibleBackend {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn kind(&self) -> VerdictKind {
        VerdictKind::Matches
    }

    async fn search(&self, query: &Query) -> Result<Verdict, BackendError> {
        let req = self
            .http
            .get(join_url(&self.base_url, "search"))
            .query(&[("keywords", query.as_str()), ("searchType", "podcast")]);
        let page = fetch_text(req, PLATFORM).await?;

        let found = scan_page(&page, &self.titles, self.scan_limit);
        if found.is_empty() {
            tracing::debug!(platform = PLATFORM, "no result anchors on search page");
        }
        let candidates = found.into_iter().map(|(title, href)| Candidate {
            title,
            url: self.absolute(&href),
            description: None,
        });
        Ok(judge(self.kind(), &self.scorer, query, candidates, self.max_matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::NO_DESCRIPTION;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
          <ul>
            <li class="productListItem"><h3 class="bc-heading">
              <a class="bc-link" href="/pd/Serial-Podcast/B08K56RZ7G">Serial</a></h3></li>
            <li class="productListItem"><h3 class="bc-heading">
              <a class="bc-link" href="https://www.audible.com/pd/Other/B0000">The   Other
                 Show</a></h3></li>
            <li><h3><a>No link here</a></h3></li>
          </ul>
        </body></html>
    "#;

    fn backend(server: &MockServer) -> AudibleBackend {
        let cfg = AudibleConfig {
            base_url: server.uri(),
            ..AudibleConfig::default()
        };
        AudibleBackend::new(reqwest::Client::new(), &cfg, SimilarityScorer::default(), 3).unwrap()
    }

    #[test]
    fn scan_collapses_whitespace_and_skips_bare_anchors() {
        let sel = Selector::parse("h3 a[href]").unwrap();
        let got = scan_page(PAGE, &sel, 10);
        assert_eq!(
            got,
            vec![
                ("Serial".to_string(), "/pd/Serial-Podcast/B08K56RZ7G".to_string()),
                ("The Other Show".to_string(), "https://www.audible.com/pd/Other/B0000".to_string()),
            ]
        );
        assert_eq!(scan_page(PAGE, &sel, 1).len(), 1);
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let cfg = AudibleConfig {
            title_selector: "h3 >>> a[".into(),
            ..AudibleConfig::default()
        };
        assert!(matches!(
            AudibleBackend::new(reqwest::Client::new(), &cfg, SimilarityScorer::default(), 3),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[tokio::test]
    async fn matches_resolve_relative_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("keywords", "serial"))
            .and(query_param("searchType", "podcast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let v = backend(&server).search(&Query::parse("serial").unwrap()).await.unwrap();
        let Verdict::Matches(m) = v else { panic!("expected list") };
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].title, "Serial");
        assert_eq!(m[0].url, format!("{}/pd/Serial-Podcast/B08K56RZ7G", server.uri()));
        assert_eq!(m[0].description, NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn changed_layout_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div>redesigned</div>"))
            .mount(&server)
            .await;

        let v = backend(&server).search(&Query::parse("Serial").unwrap()).await.unwrap();
        assert_eq!(v, Verdict::Matches(vec![]));
    }
}
