use crate::analyzer::ContentAnalyzer;
use crate::collector::SearchCollector;
use crate::config::ResearchConfig;
use crate::error::PipelineError;
use crate::extractor::{ContentExtractor, ExtractionLimits};
use crate::report::{ReportAssembler, ResearchReport};
use crate::session::ResearchSession;
use crate::synthesis::SynthesisEngine;
use researchpipe_core::{BrowserBackend, ImageFilter, SearchProvider, TextGenerator};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Search,
    Extract,
    Analyze,
    Synthesize,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Extract => "extract",
            Self::Analyze => "analyze",
            Self::Synthesize => "synthesize",
        }
    }
}

/// Progress hooks; every method defaults to a no-op.
pub trait PhaseObserver: Send + Sync {
    fn phase_started(&self, _phase: Phase) {}

    fn source_started(&self, _phase: Phase, _index: usize, _total: usize, _title: &str) {}

    fn phase_finished(&self, _phase: Phase, _items: usize) {}
}

struct Silent;

impl PhaseObserver for Silent {}

/// Drives one query through search, extraction, analysis and synthesis, in that order,
/// one source at a time.
///
/// The collaborators are borrowed handles: the pipeline never opens or closes them.
pub struct ResearchPipeline {
    config: ResearchConfig,
    collector: SearchCollector,
    extractor: ContentExtractor,
    analyzer: ContentAnalyzer,
    synthesis: SynthesisEngine,
    assembler: ReportAssembler,
    model: String,
    observer: Arc<dyn PhaseObserver>,
}

impl ResearchPipeline {
    pub fn new(
        config: ResearchConfig,
        search: Arc<dyn SearchProvider>,
        browser: Arc<dyn BrowserBackend>,
        llm: Arc<dyn TextGenerator>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let extractor = ContentExtractor::new(browser, ExtractionLimits::from(&config));
        let analyzer =
            ContentAnalyzer::new(llm.clone(), config.clone()).with_deep_source(extractor.clone());
        Ok(Self {
            collector: SearchCollector::new(search)
                .with_language_hint(config.output_language.file_suffix()),
            extractor,
            analyzer,
            synthesis: SynthesisEngine::new(llm.clone(), config.output_language),
            assembler: ReportAssembler::new(config.clone()),
            model: llm.model().to_string(),
            observer: Arc::new(Silent),
            config,
        })
    }

    pub fn with_image_filter(mut self, filter: Arc<dyn ImageFilter>) -> Self {
        self.extractor = self.extractor.with_image_filter(filter);
        self
    }

    pub fn with_search_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.collector = self.collector.with_timeout_ms(timeout_ms);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Only an empty query or a search-phase failure is an error; everything after the
    /// search degrades per source.
    pub async fn run(&self, query: &str) -> Result<ResearchSession, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }
        let mut session = ResearchSession::new(query, self.config.output_language);
        session.model = Some(self.model.clone());
        tracing::info!(query, max_sources = self.config.max_sources, "research started");

        self.observer.phase_started(Phase::Search);
        session.search_results = self.collector.collect(query, self.config.max_sources).await?;
        self.observer
            .phase_finished(Phase::Search, session.search_results.len());
        if session.search_results.is_empty() {
            return Err(PipelineError::NoSources(query.to_string()));
        }

        self.extract_phase(&mut session).await;

        self.observer.phase_started(Phase::Analyze);
        session.analyses = self
            .analyzer
            .analyze_and_refresh(&mut session.extracted, query)
            .await;
        if let Some(advisory) = self.analyzer.coverage_advisory(&session.analyses) {
            session.advisories.push(advisory.message());
        }
        self.observer
            .phase_finished(Phase::Analyze, session.analyses.len());

        self.observer.phase_started(Phase::Synthesize);
        session.final_summary = self
            .synthesis
            .generate_final_summary(&session.analyses, query)
            .await;
        self.observer.phase_finished(Phase::Synthesize, 1);

        tracing::info!(
            query,
            sources = session.search_results.len(),
            extracted = session.extracted.len(),
            high_relevance = session.high_relevance_count(self.config.relevance_threshold),
            "research finished"
        );
        Ok(session)
    }

    async fn extract_phase(&self, session: &mut ResearchSession) {
        self.observer.phase_started(Phase::Extract);
        let total = session.search_results.len();
        for (i, result) in session.search_results.iter().enumerate() {
            self.observer
                .source_started(Phase::Extract, i, total, &result.title);
            let Some(source) = self
                .extractor
                .extract_with_retry(&result.url, &result.title, &session.query)
                .await
            else {
                continue;
            };
            if self.config.include_images {
                session
                    .images
                    .extend(self.extractor.extract_images(&result.url).await);
            }
            session.extracted.push(source);
        }
        tracing::info!(
            attempted = total,
            extracted = session.extracted.len(),
            images = session.images.len(),
            "extraction finished"
        );
        self.observer
            .phase_finished(Phase::Extract, session.extracted.len());
    }

    pub fn report(&self, session: &ResearchSession) -> ResearchReport {
        self.assembler.assemble(session, self.config.output_language)
    }
}
