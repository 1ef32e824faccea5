//! Apple Podcasts via the public iTunes Search API.

use async_trait::async_trait;

use crate::config::ItunesConfig;
use crate::error::{BackendError, ConfigError};
use crate::lookup::{fetch_json, join_url, judge, Backend, JsonFieldMap, Query, Verdict, VerdictKind};
use crate::similarity::SimilarityScorer;

const PLATFORM: &str = "Apple";

pub struct AppleBackend {
    http: reqwest::Client,
    base_url: String,
    limit: u32,
    fields: JsonFieldMap,
    scorer: SimilarityScorer,
    max_matches: usize,
}

impl AppleBackend {
    pub fn new(
        http: reqwest::Client,
        cfg: &ItunesConfig,
        scorer: SimilarityScorer,
        max_matches: usize,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            limit: cfg.limit,
            fields: JsonFieldMap::new(
                "$.results",
                "$.collectionName",
                "$.collectionViewUrl",
                Some("$.description"),
            )?,
            scorer,
            max_matches,
        })
    }
}

#[async_trait]
impl Backend for AppleBackend {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn kind(&self) -> VerdictKind {
        VerdictKind::Matches
    }

    async fn search(&self, query: &Query) -> Result<Verdict, BackendError> {
        let limit = self.limit.to_string();
        let req = self.http.get(join_url(&self.base_url, "search")).query(&[
            ("term", query.as_str()),
            ("entity", "podcast"),
            ("limit", limit.as_str()),
        ]);
        let body = fetch_json(req, PLATFORM).await?;
        let candidates = self.fields.candidates(&body)?;
        tracing::debug!(platform = PLATFORM, candidates = candidates.len(), "parsed results");
        Ok(judge(self.kind(), &self.scorer, query, candidates, self.max_matches))
    }
}
