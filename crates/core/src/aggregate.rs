//! Fan one query out to every registered backend and collect the verdicts.
//!
//! Every backend runs on its own task under a shared deadline and
//! cancellation token. Errors, panics, timeouts and cancellation all collapse
//! into the backend's declared empty verdict, so a lookup always yields one
//! entry per backend, in registration order.

use std::sync::Arc;
use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::{ConfigError, ValidationError};
use crate::lookup::{default_registry, Backend, BackendRegistry, Query, Verdict, MAX_MATCHES};

/// Platform name -> verdict, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateResult {
    entries: Vec<(String, Verdict)>,
}

impl AggregateResult {
    pub fn get(&self, platform: &str) -> Option<&Verdict> {
        self.entries
            .iter()
            .find(|(name, _)| name == platform)
            .map(|(_, v)| v)
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Verdict)> {
        self.entries.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AggregateResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, verdict) in &self.entries {
            map.serialize_entry(name, verdict)?;
        }
        map.end()
    }
}

/// Deadline and cancellation signal for one lookup.
#[derive(Debug, Clone)]
pub struct LookupContext {
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl LookupContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug)]
pub struct Aggregator {
    registry: BackendRegistry,
    timeout: Duration,
    max_matches: usize,
}

impl Aggregator {
    pub fn new(registry: BackendRegistry, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            max_matches: MAX_MATCHES,
        }
    }

    /// Build the standard platform set with a shared HTTP client.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ConfigError> {
        let http = cfg.http_client()?;
        let registry = default_registry(cfg, &http)?;
        Ok(Self::new(registry, cfg.lookup.timeout())
            .with_max_matches(cfg.lookup.max_matches))
    }

    pub fn with_max_matches(mut self, max: usize) -> Self {
        self.max_matches = max.min(MAX_MATCHES);
        self
    }

    pub fn platforms(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up `raw` on every platform with the configured timeout.
    pub async fn lookup(&self, raw: &str) -> Result<AggregateResult, ValidationError> {
        self.lookup_with(raw, &LookupContext::with_timeout(self.timeout))
            .await
    }

    /// Look up `raw` under a caller-supplied deadline and cancellation token.
    pub async fn lookup_with(
        &self,
        raw: &str,
        ctx: &LookupContext,
    ) -> Result<AggregateResult, ValidationError> {
        let query = Query::parse(raw)?;
        let started = Instant::now();
        tracing::info!(query = %query, platforms = self.registry.len(), "lookup started");

        let mut slots: Vec<(String, Verdict)> = self
            .registry
            .iter()
            .map(|b| (b.name().to_string(), b.kind().empty()))
            .collect();

        // Dropping the set aborts whatever is still running.
        let mut tasks = JoinSet::new();
        for (idx, backend) in self.registry.iter().enumerate() {
            let backend = Arc::clone(backend);
            let query = query.clone();
            let ctx = ctx.clone();
            let max = self.max_matches;
            tasks.spawn(async move { (idx, run_backend(backend, query, ctx, max).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, verdict)) => slots[idx].1 = verdict,
                Err(e) => tracing::error!(error = %e, "backend task panicked"),
            }
        }

        let found = slots.iter().filter(|(_, v)| v.is_found()).count();
        tracing::info!(
            query = %query,
            found,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lookup finished"
        );
        Ok(AggregateResult { entries: slots })
    }
}

/// Run one backend to completion, deadline or cancellation. Never fails.
async fn run_backend(
    backend: Arc<dyn Backend>,
    query: Query,
    ctx: LookupContext,
    max: usize,
) -> Verdict {
    let platform = backend.name().to_string();
    let empty = backend.kind().empty();

    let outcome = tokio::select! {
        _ = ctx.cancel.cancelled() => {
            tracing::warn!(platform = %platform, "lookup cancelled");
            return empty;
        }
        res = tokio::time::timeout_at(ctx.deadline, backend.search(&query)) => res,
    };

    match outcome {
        Ok(Ok(verdict)) if verdict.kind() == empty.kind() => {
            tracing::debug!(platform = %platform, found = verdict.is_found(), "backend answered");
            verdict.truncated(max)
        }
        Ok(Ok(verdict)) => {
            tracing::warn!(
                platform = %platform,
                declared = ?empty.kind(),
                returned = ?verdict.kind(),
                "backend returned undeclared verdict shape"
            );
            empty
        }
        Ok(Err(e)) => {
            tracing::warn!(platform = %platform, error = %e, "backend failed");
            empty
        }
        Err(_) => {
            tracing::warn!(platform = %platform, "backend timed out");
            empty
        }
    }
}
