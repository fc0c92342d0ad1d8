use crate::error::PipelineError;
use crate::language::OutputLanguage;
use serde::{Deserialize, Serialize};

/// Knobs for one research run.
///
/// Built once and handed to every phase; nothing reads thresholds from ambient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub max_sources: usize,
    /// Character budget for the first extraction attempt.
    pub content_limit: usize,
    /// Character budget for the escalated (deep) extraction attempt.
    pub deep_content_limit: usize,
    /// Scores at or above this count as high relevance (0..=10).
    pub relevance_threshold: f64,
    pub min_word_count: usize,
    /// Total extraction attempts per source, including the first.
    pub max_retry_attempts: u32,
    pub output_language: OutputLanguage,
    pub include_images: bool,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_sources: 8,
            content_limit: 4096,
            deep_content_limit: 8192,
            relevance_threshold: 5.0,
            min_word_count: 300,
            max_retry_attempts: 2,
            output_language: OutputLanguage::English,
            include_images: true,
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_sources == 0 {
            return Err(PipelineError::Config("max_sources must be > 0".to_string()));
        }
        if self.content_limit == 0 {
            return Err(PipelineError::Config(
                "content_limit must be > 0".to_string(),
            ));
        }
        if self.deep_content_limit < self.content_limit {
            return Err(PipelineError::Config(format!(
                "deep_content_limit ({}) must be >= content_limit ({})",
                self.deep_content_limit, self.content_limit
            )));
        }
        if self.max_retry_attempts == 0 {
            return Err(PipelineError::Config(
                "max_retry_attempts must be >= 1 (it counts the first attempt)".to_string(),
            ));
        }
        if !self.relevance_threshold.is_finite() || self.relevance_threshold < 0.0 {
            return Err(PipelineError::Config(format!(
                "relevance_threshold must be a finite value >= 0 (got {})",
                self.relevance_threshold
            )));
        }
        Ok(())
    }

    /// Whether a second, escalated attempt is allowed at all.
    pub fn escalation_allowed(&self) -> bool {
        self.max_retry_attempts >= 2
    }

    /// Minimum score for a source to appear among a report's key findings.
    pub fn key_finding_floor(&self) -> f64 {
        (self.relevance_threshold - 2.0).max(3.0)
    }
}
