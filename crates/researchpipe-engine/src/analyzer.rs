use crate::config::ResearchConfig;
use crate::extractor::ContentExtractor;
use crate::language::Prompts;
use crate::session::{AnalysisMethod, AnalysisResult, CoverageAdvisory, ExtractedSource, ExtractionDepth};
use crate::textstats::{extract_themes, relevance_score, word_count};
use researchpipe_core::{Result, TextGenerator};
use std::sync::Arc;

/// High-relevance sources below which a run is considered thin.
pub const MIN_HIGH_RELEVANCE_SOURCES: usize = 3;

/// Phase 3: per-source summary, key finding, relevance and themes, with one escalation
/// to the enhanced prompt when a source scores low or is too short.
pub struct ContentAnalyzer {
    llm: Arc<dyn TextGenerator>,
    config: ResearchConfig,
    prompts: Prompts,
    deep_source: Option<ContentExtractor>,
}

impl ContentAnalyzer {
    pub fn new(llm: Arc<dyn TextGenerator>, config: ResearchConfig) -> Self {
        let prompts = config.output_language.prompts();
        Self {
            llm,
            config,
            prompts,
            deep_source: None,
        }
    }

    /// Extractor used to fetch deeper content when a source is too short.
    pub fn with_deep_source(mut self, extractor: ContentExtractor) -> Self {
        self.deep_source = Some(extractor);
        self
    }

    /// One result per source, in input order. Never fails; LLM errors degrade the
    /// affected source only.
    pub async fn analyze_sources(
        &self,
        sources: &[ExtractedSource],
        query: &str,
    ) -> Vec<AnalysisResult> {
        let mut out = Vec::with_capacity(sources.len());
        for (i, source) in sources.iter().enumerate() {
            tracing::debug!(index = i, title = %source.title, "analyzing source");
            out.push(self.analyze_source(source, query).await);
        }
        self.warn_on_thin_coverage(&out);
        out
    }

    /// Like [`Self::analyze_sources`], but a source whose analysis pulled deeper content is
    /// replaced by that deeper extraction, so `sources` keeps describing what was analyzed.
    pub async fn analyze_and_refresh(
        &self,
        sources: &mut [ExtractedSource],
        query: &str,
    ) -> Vec<AnalysisResult> {
        let mut out = Vec::with_capacity(sources.len());
        for (i, source) in sources.iter_mut().enumerate() {
            tracing::debug!(index = i, title = %source.title, "analyzing source");
            let (result, deeper) = self.analyze_tracking_depth(source, query).await;
            if let Some(deeper) = deeper {
                *source = deeper;
            }
            out.push(result);
        }
        self.warn_on_thin_coverage(&out);
        out
    }

    fn warn_on_thin_coverage(&self, analyses: &[AnalysisResult]) {
        if let Some(advisory) = self.coverage_advisory(analyses) {
            tracing::warn!(
                high_relevance = advisory.high_relevance,
                analyzed = advisory.analyzed,
                "{}",
                advisory.message()
            );
        }
    }

    pub fn coverage_advisory(&self, analyses: &[AnalysisResult]) -> Option<CoverageAdvisory> {
        let high_relevance = analyses
            .iter()
            .filter(|a| a.relevance_score >= self.config.relevance_threshold)
            .count();
        if high_relevance < MIN_HIGH_RELEVANCE_SOURCES && analyses.len() < self.config.max_sources
        {
            Some(CoverageAdvisory {
                high_relevance,
                analyzed: analyses.len(),
                max_sources: self.config.max_sources,
            })
        } else {
            None
        }
    }

    pub async fn analyze_source(&self, source: &ExtractedSource, query: &str) -> AnalysisResult {
        self.analyze_tracking_depth(source, query).await.0
    }

    /// The analysis, plus the deeper extraction it was based on when one was pulled.
    async fn analyze_tracking_depth(
        &self,
        source: &ExtractedSource,
        query: &str,
    ) -> (AnalysisResult, Option<ExtractedSource>) {
        let first = self
            .analyze_pass(
                source,
                &source.content,
                source.extraction_depth,
                query,
                AnalysisMethod::Normal,
            )
            .await;

        let thin = first.word_count < self.config.min_word_count;
        let low = first.relevance_score < self.config.relevance_threshold;
        if !(thin || low) || !self.config.escalation_allowed() {
            return (first, None);
        }

        tracing::info!(
            url = %source.url,
            relevance_score = first.relevance_score,
            word_count = first.word_count,
            thin,
            "escalating to enhanced analysis"
        );

        if thin {
            if let Some(deeper) = self.deeper_content(source, query).await {
                let result = self
                    .analyze_pass(
                        source,
                        &deeper.content,
                        ExtractionDepth::Deep,
                        query,
                        AnalysisMethod::Enhanced,
                    )
                    .await;
                return (result, Some(deeper));
            }
        }
        let result = self
            .analyze_pass(
                source,
                &source.content,
                source.extraction_depth,
                query,
                AnalysisMethod::Enhanced,
            )
            .await;
        (result, None)
    }

    async fn deeper_content(
        &self,
        source: &ExtractedSource,
        query: &str,
    ) -> Option<ExtractedSource> {
        let extractor = self.deep_source.as_ref()?;
        let deeper = extractor.extract_deeper(source, query).await?;
        (deeper.word_count > source.word_count).then_some(deeper)
    }

    /// A single analysis pass over `content`. Two independent LLM calls (summary, key
    /// finding); score and themes are computed locally.
    pub async fn analyze_pass(
        &self,
        source: &ExtractedSource,
        content: &str,
        depth: ExtractionDepth,
        query: &str,
        method: AnalysisMethod,
    ) -> AnalysisResult {
        let mut result = AnalysisResult {
            title: source.title.clone(),
            url: source.url.clone(),
            summary: String::new(),
            key_finding: String::new(),
            relevance_score: AnalysisResult::NO_CONTENT_SCORE,
            themes: Vec::new(),
            word_count: word_count(content),
            extraction_method: depth,
            analysis_method: method,
        };

        if content.trim().is_empty() {
            result.summary = "No content available for analysis".to_string();
            result.key_finding = "Unable to extract content".to_string();
            return result;
        }

        match self.generate_pair(&source.title, content, query, method).await {
            Ok((summary, key_finding)) => {
                result.relevance_score = relevance_score(content, query, &summary);
                result.themes = extract_themes(content);
                result.summary = summary;
                result.key_finding = key_finding;
                tracing::debug!(
                    url = %source.url,
                    relevance_score = result.relevance_score,
                    ?method,
                    "analysis pass complete"
                );
            }
            Err(e) => {
                tracing::warn!(url = %source.url, error = %e, "analysis failed");
                result.relevance_score = AnalysisResult::FAILED_SCORE;
                result.key_finding = AnalysisResult::FAILED_FINDING.to_string();
                result.summary = format!("Error analyzing content: {e}");
            }
        }
        result
    }

    async fn generate_pair(
        &self,
        title: &str,
        content: &str,
        query: &str,
        method: AnalysisMethod,
    ) -> Result<(String, String)> {
        let summary_prompt = match method {
            AnalysisMethod::Normal => self.prompts.source_summary(query, title, content),
            AnalysisMethod::Enhanced => self.prompts.enhanced_summary(query, title, content),
        };
        let summary = self.llm.generate(&summary_prompt, None).await?;
        let finding_prompt = self.prompts.key_finding(query, title, content);
        let key_finding = self.llm.generate(&finding_prompt, None).await?;
        Ok((summary.trim().to_string(), key_finding.trim().to_string()))
    }
}
