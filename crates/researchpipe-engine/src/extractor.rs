use crate::config::ResearchConfig;
use crate::session::{ExtractedSource, ExtractionDepth};
use crate::textstats::word_count;
use researchpipe_core::{BrowserBackend, ExtractRequest, ExtractionResult, ImageFilter, ImageRef};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    pub content_limit: usize,
    pub deep_content_limit: usize,
    pub min_word_count: usize,
    pub max_retry_attempts: u32,
}

impl From<&ResearchConfig> for ExtractionLimits {
    fn from(c: &ResearchConfig) -> Self {
        Self {
            content_limit: c.content_limit,
            deep_content_limit: c.deep_content_limit,
            min_word_count: c.min_word_count,
            max_retry_attempts: c.max_retry_attempts,
        }
    }
}

impl ExtractionLimits {
    fn budget(&self, depth: ExtractionDepth) -> usize {
        match depth {
            ExtractionDepth::Normal => self.content_limit,
            ExtractionDepth::Deep => self.deep_content_limit,
        }
    }
}

/// Phase 2: pulls page text through the browser, escalating to a larger budget when the
/// first pull is too thin.
///
/// The browser handle belongs to the caller; the extractor never opens or closes it.
#[derive(Clone)]
pub struct ContentExtractor {
    browser: Arc<dyn BrowserBackend>,
    images: Option<Arc<dyn ImageFilter>>,
    limits: ExtractionLimits,
}

impl ContentExtractor {
    pub fn new(browser: Arc<dyn BrowserBackend>, limits: ExtractionLimits) -> Self {
        Self {
            browser,
            images: None,
            limits,
        }
    }

    pub fn with_image_filter(mut self, filter: Arc<dyn ImageFilter>) -> Self {
        self.images = Some(filter);
        self
    }

    pub fn limits(&self) -> ExtractionLimits {
        self.limits
    }

    /// Returns `None` when the page cannot be navigated or yields no text.
    ///
    /// At most `max_retry_attempts` extraction calls are made. A thin deep result is still
    /// returned; thinness is for the analyzer to judge.
    pub async fn extract_with_retry(
        &self,
        url: &str,
        title: &str,
        query: &str,
    ) -> Option<ExtractedSource> {
        let first = self
            .extract_once(url, title, query, ExtractionDepth::Normal, 1)
            .await?;

        let thin = first.word_count < self.limits.min_word_count;
        if !thin || first.attempts >= self.limits.max_retry_attempts {
            return Some(first);
        }

        tracing::info!(
            url,
            word_count = first.word_count,
            min_word_count = self.limits.min_word_count,
            "low word count, retrying with deep extraction"
        );
        match self
            .extract_once(url, title, query, ExtractionDepth::Deep, first.attempts + 1)
            .await
        {
            Some(deep) if deep.word_count >= first.word_count => Some(deep),
            Some(deep) => {
                tracing::debug!(
                    url,
                    normal = first.word_count,
                    deep = deep.word_count,
                    "deep extraction yielded less text; keeping first pass"
                );
                Some(ExtractedSource {
                    attempts: deep.attempts,
                    ..first
                })
            }
            None => Some(ExtractedSource {
                attempts: first.attempts + 1,
                ..first
            }),
        }
    }

    /// One deep-budget pull for a source that was extracted at normal depth.
    ///
    /// Returns `None` when the retry budget is already spent or the pull fails.
    pub async fn extract_deeper(
        &self,
        source: &ExtractedSource,
        query: &str,
    ) -> Option<ExtractedSource> {
        if source.extraction_depth == ExtractionDepth::Deep
            || source.attempts >= self.limits.max_retry_attempts
        {
            return None;
        }
        self.extract_once(
            &source.url,
            &source.title,
            query,
            ExtractionDepth::Deep,
            source.attempts + 1,
        )
        .await
    }

    async fn extract_once(
        &self,
        url: &str,
        title: &str,
        query: &str,
        depth: ExtractionDepth,
        attempt: u32,
    ) -> Option<ExtractedSource> {
        let req = ExtractRequest {
            url: url.to_string(),
            query: Some(query.to_string()).filter(|q| !q.trim().is_empty()),
            max_length: self.limits.budget(depth),
        };
        match self.browser.extract(&req).await {
            ExtractionResult::Success {
                title: page_title,
                content,
                truncated,
            } => {
                if content.trim().is_empty() {
                    tracing::warn!(url, attempt, "extraction returned no content; dropping source");
                    return None;
                }
                let words = word_count(&content);
                tracing::debug!(url, attempt, ?depth, words, truncated, "extracted content");
                let title = if title.trim().is_empty() {
                    page_title
                } else {
                    title.to_string()
                };
                Some(ExtractedSource {
                    title,
                    url: url.to_string(),
                    content,
                    word_count: words,
                    extraction_depth: depth,
                    attempts: attempt,
                })
            }
            ExtractionResult::Error { message } => {
                tracing::warn!(url, attempt, error = %message, "extraction failed; dropping source");
                None
            }
        }
    }

    /// Best-effort image discovery on the same page. Failures yield an empty list.
    pub async fn extract_images(&self, url: &str) -> Vec<ImageRef> {
        let Some(filter) = &self.images else {
            return Vec::new();
        };
        match self.browser.navigate(url).await {
            Ok(page) => {
                let base = if page.final_url.is_empty() {
                    url
                } else {
                    page.final_url.as_str()
                };
                let picked = filter.select(base, &page.images);
                if !picked.is_empty() {
                    tracing::debug!(url, images = picked.len(), "found images on page");
                }
                picked
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "image extraction failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ok, words, ScriptedBrowser};
    use proptest::prelude::*;
    use researchpipe_core::ImageCandidate;

    fn limits(max_retry_attempts: u32) -> ExtractionLimits {
        ExtractionLimits {
            content_limit: 4096,
            deep_content_limit: 8192,
            min_word_count: 300,
            max_retry_attempts,
        }
    }

    #[tokio::test]
    async fn thin_first_pass_escalates_to_deep() {
        let browser = Arc::new(
            ScriptedBrowser::default().script("u", vec![ok(words(120)), ok(words(900))]),
        );
        let ex = ContentExtractor::new(browser.clone(), limits(2));
        let src = ex.extract_with_retry("u", "Title", "solar").await.unwrap();
        assert_eq!(src.extraction_depth, ExtractionDepth::Deep);
        assert_eq!(src.word_count, 900);
        assert_eq!(src.attempts, 2);
        assert_eq!(browser.calls_for("u"), vec![4096, 8192]);
    }

    #[tokio::test]
    async fn substantial_first_pass_is_not_retried() {
        let browser = Arc::new(ScriptedBrowser::default().script("u", vec![ok(words(400))]));
        let ex = ContentExtractor::new(browser.clone(), limits(2));
        let src = ex.extract_with_retry("u", "Title", "solar").await.unwrap();
        assert_eq!(src.extraction_depth, ExtractionDepth::Normal);
        assert_eq!(browser.calls_for("u").len(), 1);
    }

    #[tokio::test]
    async fn failed_navigation_drops_the_source_without_retry() {
        let browser = Arc::new(ScriptedBrowser::default());
        let ex = ContentExtractor::new(browser.clone(), limits(2));
        assert!(ex.extract_with_retry("missing", "T", "q").await.is_none());
        assert_eq!(browser.calls_for("missing").len(), 1);
    }

    #[tokio::test]
    async fn thin_deep_result_is_returned_anyway() {
        let browser = Arc::new(
            ScriptedBrowser::default().script("u", vec![ok(words(50)), ok(words(80))]),
        );
        let ex = ContentExtractor::new(browser, limits(2));
        let src = ex.extract_with_retry("u", "T", "q").await.unwrap();
        assert_eq!(src.extraction_depth, ExtractionDepth::Deep);
        assert_eq!(src.word_count, 80);
    }

    #[tokio::test]
    async fn failed_deep_attempt_keeps_the_first_pass() {
        let browser = Arc::new(ScriptedBrowser::default().script(
            "u",
            vec![ok(words(50)), ExtractionResult::error("timeout")],
        ));
        let ex = ContentExtractor::new(browser, limits(2));
        let src = ex.extract_with_retry("u", "T", "q").await.unwrap();
        assert_eq!(src.extraction_depth, ExtractionDepth::Normal);
        assert_eq!(src.word_count, 50);
        assert_eq!(src.attempts, 2);
        // Budget spent: no further deep pull is offered.
        assert!(ContentExtractor::new(Arc::new(ScriptedBrowser::default()), limits(2))
            .extract_deeper(&src, "q")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn blank_title_falls_back_to_page_title() {
        let browser = Arc::new(ScriptedBrowser::default().script("u", vec![ok(words(400))]));
        let ex = ContentExtractor::new(browser, limits(2));
        let src = ex.extract_with_retry("u", "  ", "q").await.unwrap();
        assert_eq!(src.title, "Page");
    }

    #[tokio::test]
    async fn image_failures_never_fail_the_source() {
        struct TakeAll;
        impl ImageFilter for TakeAll {
            fn select(&self, page_url: &str, c: &[ImageCandidate]) -> Vec<ImageRef> {
                c.iter()
                    .map(|i| ImageRef {
                        url: i.src.clone(),
                        alt: i.alt.clone().unwrap_or_default(),
                        source_page: page_url.to_string(),
                    })
                    .collect()
            }
        }
        let browser = Arc::new(ScriptedBrowser {
            images: vec![ImageCandidate {
                src: "https://e.com/chart.png".to_string(),
                alt: Some("chart".to_string()),
            }],
            ..ScriptedBrowser::default()
        });
        let ex = ContentExtractor::new(browser, limits(2)).with_image_filter(Arc::new(TakeAll));
        assert_eq!(ex.extract_images("https://e.com/a").await.len(), 1);
        assert!(ex.extract_images("https://e.com/broken").await.is_empty());
    }

    proptest! {
        #[test]
        fn never_exceeds_max_retry_attempts(
            max_attempts in 1u32..4,
            first in 0usize..600,
            second in 0usize..600,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let browser = Arc::new(ScriptedBrowser::default().script(
                "u",
                vec![ok(words(first.max(1))), ok(words(second.max(1))), ok(words(1000))],
            ));
            let ex = ContentExtractor::new(browser.clone(), limits(max_attempts));
            let src = rt.block_on(ex.extract_with_retry("u", "T", "q")).unwrap();
            let deeper = rt.block_on(ex.extract_deeper(&src, "q"));
            let calls = browser.calls_for("u").len() as u32;
            prop_assert!(calls <= max_attempts, "calls={} max={}", calls, max_attempts);
            prop_assert!(src.attempts <= max_attempts);
            if let Some(d) = deeper {
                prop_assert!(d.attempts <= max_attempts);
            }
        }
    }
}
