//! Phase 4: one narrative summary from all per-source analyses.
//!
//! Generation is tried with an ordered list of prompt strategies, each shrinking the
//! prompt further. When every strategy fails, a summary is assembled directly from the
//! findings, so the result is never empty.

use crate::language::{OutputLanguage, Prompts};
use crate::session::{AnalysisResult, Theme};
use crate::textstats::truncate_chars;
use researchpipe_core::{Error, Result, TextGenerator};
use std::fmt::Write as _;
use std::sync::Arc;

/// Analyses scoring below this are left out of synthesis.
pub const FINDING_SCORE_FLOOR: f64 = 3.0;
pub const MAX_FINDINGS: usize = 5;
pub const MAX_THEMES: usize = 5;
/// Character cap on the findings text in the condensed prompt.
pub const CONDENSED_FINDINGS_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStrategy {
    /// Findings, themes and the full section layout.
    Full,
    /// Truncated findings only, with a shorter target length.
    Condensed,
}

/// Strategies tried in order; one generation attempt each.
pub const SYNTHESIS_STRATEGIES: [PromptStrategy; 3] = [
    PromptStrategy::Full,
    PromptStrategy::Condensed,
    PromptStrategy::Condensed,
];

impl PromptStrategy {
    pub fn build(self, prompts: &Prompts, input: &SynthesisInput) -> String {
        let findings = input.findings_text();
        match self {
            Self::Full => {
                let themes = input.themes_text(prompts.language());
                prompts.final_summary(&input.query, &findings, &themes)
            }
            Self::Condensed => prompts.condensed_summary(
                &input.query,
                &truncate_chars(&findings, CONDENSED_FINDINGS_CHARS),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub source_title: String,
    pub text: String,
    pub relevance_score: f64,
}

impl Finding {
    fn from_analysis(a: &AnalysisResult) -> Self {
        Self {
            source_title: a.title.clone(),
            text: a.key_finding.clone(),
            relevance_score: a.relevance_score,
        }
    }
}

/// Everything a prompt strategy or the fallback needs, computed once.
#[derive(Debug, Clone)]
pub struct SynthesisInput {
    pub query: String,
    /// At most `MAX_FINDINGS`, highest score first.
    pub findings: Vec<Finding>,
    pub themes: Vec<Theme>,
    pub analyzed: usize,
}

impl SynthesisInput {
    pub fn from_analyses(query: &str, analyses: &[AnalysisResult]) -> Self {
        let mut kept: Vec<&AnalysisResult> = analyses
            .iter()
            .filter(|a| a.relevance_score >= FINDING_SCORE_FLOOR)
            .collect();
        kept.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        let themes = Theme::aggregate(kept.iter().copied(), MAX_THEMES);
        Self {
            query: query.to_string(),
            findings: kept
                .iter()
                .take(MAX_FINDINGS)
                .map(|a| Finding::from_analysis(a))
                .collect(),
            themes,
            analyzed: analyses.len(),
        }
    }

    pub fn findings_text(&self) -> String {
        self.findings
            .iter()
            .map(|f| format!("• {}", f.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn themes_text(&self, language: OutputLanguage) -> String {
        let labels = language.labels();
        self.themes
            .iter()
            .map(|t| format!("• {} ({})", t.name, labels.mentioned(t.support_count)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct SynthesisEngine {
    llm: Arc<dyn TextGenerator>,
    language: OutputLanguage,
}

impl SynthesisEngine {
    pub fn new(llm: Arc<dyn TextGenerator>, language: OutputLanguage) -> Self {
        Self { llm, language }
    }

    /// Never empty, never an error.
    ///
    /// With no analyses the language service is not called and the findings-only summary
    /// is returned.
    pub async fn generate_final_summary(&self, analyses: &[AnalysisResult], query: &str) -> String {
        let input = SynthesisInput::from_analyses(query, analyses);
        if analyses.is_empty() {
            tracing::info!("no analyzed sources; skipping generated summary");
            return self.fallback_summary(&input, analyses);
        }
        let prompts = self.language.prompts();
        for (i, strategy) in SYNTHESIS_STRATEGIES.iter().enumerate() {
            let attempt = i + 1;
            let prompt = strategy.build(&prompts, &input);
            match self.attempt(&prompt).await {
                Ok(summary) => {
                    tracing::info!(attempt, ?strategy, "final summary generated");
                    return summary;
                }
                Err(e) => {
                    tracing::warn!(attempt, ?strategy, error = %e, "final summary generation failed");
                }
            }
        }
        tracing::warn!(
            attempts = SYNTHESIS_STRATEGIES.len(),
            "language service unavailable; building summary from findings"
        );
        self.fallback_summary(&input, analyses)
    }

    async fn attempt(&self, prompt: &str) -> Result<String> {
        let text = self.llm.generate(prompt, None).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Llm("empty completion".to_string()));
        }
        Ok(text.to_string())
    }

    /// Summary built directly from the collected findings.
    ///
    /// Uses every analysis when none cleared the score floor.
    pub fn fallback_summary(&self, input: &SynthesisInput, analyses: &[AnalysisResult]) -> String {
        let labels = self.language.labels();
        let findings: Vec<Finding> = if input.findings.is_empty() {
            analyses.iter().map(Finding::from_analysis).collect()
        } else {
            input.findings.clone()
        };

        let mut out = String::new();
        let _ = writeln!(out, "## {}\n", labels.fallback_header);
        let _ = writeln!(out, "{}\n", labels.fallback_notice);
        let _ = writeln!(out, "**{}:** {}\n", labels.query, input.query);
        let _ = writeln!(out, "### {}\n", labels.findings_collected);
        if findings.is_empty() {
            let _ = writeln!(out, "{}", labels.no_findings);
        }
        for (i, f) in findings.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}**: {} ({}: {:.1}/10)",
                i + 1,
                f.source_title,
                f.text,
                labels.relevance_score,
                f.relevance_score
            );
        }
        let _ = writeln!(out, "\n### {}\n", labels.research_statistics);
        let _ = writeln!(out, "- {}: {}", labels.sources_analyzed, input.analyzed);
        let _ = writeln!(out, "- {}: {}", labels.key_findings, findings.len());
        if !input.themes.is_empty() {
            let names: Vec<&str> = input.themes.iter().map(|t| t.name.as_str()).collect();
            let _ = writeln!(out, "- {}: {}", labels.identified_themes, names.join(", "));
        }
        out.trim_end().to_string()
    }
}
