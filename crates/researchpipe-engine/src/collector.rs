use crate::error::PipelineError;
use researchpipe_core::{SearchProvider, SearchQuery, SearchResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Phase 1: turns a query into a bounded, deduplicated list of candidate sources.
#[derive(Clone)]
pub struct SearchCollector {
    provider: Arc<dyn SearchProvider>,
    language: Option<String>,
    timeout_ms: Option<u64>,
}

impl SearchCollector {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            language: None,
            timeout_ms: None,
        }
    }

    /// Language hint forwarded to providers that support one.
    pub fn with_language_hint(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Per-request search timeout; providers apply their own default when unset.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Calls the provider once (no retries), keeps the first `max_sources` results, and
    /// drops duplicates and results without a URL or title.
    pub async fn collect(
        &self,
        query: &str,
        max_sources: usize,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        let q = SearchQuery {
            query: query.to_string(),
            max_results: Some(max_sources),
            language: self.language.clone(),
            timeout_ms: self.timeout_ms,
        };
        let resp = self
            .provider
            .search(&q)
            .await
            .map_err(PipelineError::SearchPhase)?;
        let raw = resp.results.len();
        let out = dedup_results(resp.results.into_iter().take(max_sources));
        tracing::info!(
            provider = %resp.provider,
            raw,
            kept = out.len(),
            "search completed"
        );
        Ok(out)
    }
}

/// First-seen-wins dedup by URL, order preserved.
pub fn dedup_results<I>(results: I) -> Vec<SearchResult>
where
    I: IntoIterator<Item = SearchResult>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for r in results {
        if r.url.trim().is_empty() || r.title.trim().is_empty() {
            continue;
        }
        if seen.insert(r.url.clone()) {
            out.push(r);
        }
    }
    out
}
