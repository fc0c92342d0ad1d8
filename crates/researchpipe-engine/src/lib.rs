//! Adaptive research synthesis.
//!
//! A query flows through five phases, each one source at a time:
//! [`SearchCollector`] → [`ContentExtractor`] → [`ContentAnalyzer`] → [`SynthesisEngine`]
//! → [`ReportAssembler`]. [`ResearchPipeline`] wires them together over the collaborator
//! traits from `researchpipe-core`.

pub mod analyzer;
pub mod collector;
pub mod config;
pub mod error;
pub mod extractor;
pub mod language;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod synthesis;
pub mod textstats;

#[cfg(test)]
mod testutil;

pub use analyzer::ContentAnalyzer;
pub use collector::SearchCollector;
pub use config::ResearchConfig;
pub use error::PipelineError;
pub use extractor::{ContentExtractor, ExtractionLimits};
pub use language::OutputLanguage;
pub use pipeline::{Phase, PhaseObserver, ResearchPipeline};
pub use report::{auto_filename, ReportAssembler, ReportStatistics, ResearchReport};
pub use session::{
    AnalysisMethod, AnalysisResult, CoverageAdvisory, ExtractedSource, ExtractionDepth,
    ResearchSession, Theme,
};
pub use synthesis::{PromptStrategy, SynthesisEngine, SynthesisInput};
