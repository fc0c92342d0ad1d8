use crate::language::OutputLanguage;
use crate::textstats::rank_by_frequency;
use chrono::{DateTime, Utc};
use researchpipe_core::{ImageRef, SearchResult};
use serde::{Deserialize, Serialize};

/// How large a content budget was used to pull a source's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionDepth {
    #[default]
    Normal,
    Deep,
}

impl ExtractionDepth {
    pub fn marker(self) -> char {
        match self {
            Self::Normal => 'N',
            Self::Deep => 'D',
        }
    }
}

/// Whether the richer, escalated analysis prompt was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    #[default]
    Normal,
    Enhanced,
}

impl AnalysisMethod {
    pub fn marker(self) -> char {
        match self {
            Self::Normal => 'N',
            Self::Enhanced => 'E',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSource {
    pub title: String,
    pub url: String,
    pub content: String,
    pub word_count: usize,
    pub extraction_depth: ExtractionDepth,
    /// Extraction calls spent on this source so far.
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub key_finding: String,
    /// 0..=10. A fresh measurement per attempt, not a refinement of the previous one.
    pub relevance_score: f64,
    pub themes: Vec<String>,
    pub word_count: usize,
    pub extraction_method: ExtractionDepth,
    pub analysis_method: AnalysisMethod,
}

impl AnalysisResult {
    /// Score recorded when the language model failed during analysis.
    pub const FAILED_SCORE: f64 = 1.0;
    /// Score recorded when there was no content to analyze at all.
    pub const NO_CONTENT_SCORE: f64 = 0.0;
    pub const FAILED_FINDING: &'static str = "Analysis failed";

    pub fn is_failed(&self) -> bool {
        self.key_finding == Self::FAILED_FINDING
    }

    /// `N/N`, `D/E`, ... as shown in report tables.
    pub fn depth_marker(&self) -> String {
        format!(
            "{}/{}",
            self.extraction_method.marker(),
            self.analysis_method.marker()
        )
    }
}

/// A keyword recurring across sources, with the sources that mention it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub support_count: usize,
    pub supporting_source_titles: Vec<String>,
}

impl Theme {
    /// Frequency-ranked themes across `analyses`, at most `limit`.
    ///
    /// Ties keep the order in which themes first appear.
    pub fn aggregate<'a, I>(analyses: I, limit: usize) -> Vec<Theme>
    where
        I: IntoIterator<Item = &'a AnalysisResult>,
        I::IntoIter: Clone,
    {
        let analyses = analyses.into_iter();
        let ranked = rank_by_frequency(
            analyses
                .clone()
                .flat_map(|a| a.themes.iter().map(String::as_str)),
        );
        ranked
            .into_iter()
            .take(limit)
            .map(|(name, support_count)| {
                let supporting_source_titles = analyses
                    .clone()
                    .filter(|a| a.themes.iter().any(|t| t == &name))
                    .map(|a| a.title.clone())
                    .collect();
                Theme {
                    name,
                    support_count,
                    supporting_source_titles,
                }
            })
            .collect()
    }
}

/// Raised when too few sources cleared the relevance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAdvisory {
    pub high_relevance: usize,
    pub analyzed: usize,
    pub max_sources: usize,
}

impl CoverageAdvisory {
    pub fn message(&self) -> String {
        format!(
            "Found only {} high-relevance sources out of {} analyzed (max {}). Consider expanding search.",
            self.high_relevance, self.analyzed, self.max_sources
        )
    }
}

/// State of one query execution, mutated in place phase by phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSession {
    pub query: String,
    pub language: OutputLanguage,
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Deduplicated by URL, in provider ranking order.
    pub search_results: Vec<SearchResult>,
    /// Sources that extracted successfully, in `search_results` order.
    pub extracted: Vec<ExtractedSource>,
    /// Index-aligned with `extracted`.
    pub analyses: Vec<AnalysisResult>,
    pub images: Vec<ImageRef>,
    /// Empty until synthesis has run.
    pub final_summary: String,
    pub advisories: Vec<String>,
}

impl ResearchSession {
    pub fn new(query: impl Into<String>, language: OutputLanguage) -> Self {
        Self {
            query: query.into(),
            language,
            model: None,
            started_at: Utc::now(),
            search_results: Vec::new(),
            extracted: Vec::new(),
            analyses: Vec::new(),
            images: Vec::new(),
            final_summary: String::new(),
            advisories: Vec::new(),
        }
    }

    pub fn high_relevance_count(&self, threshold: f64) -> usize {
        self.analyses
            .iter()
            .filter(|a| a.relevance_score >= threshold)
            .count()
    }

    /// Pairs each analysis with the source it was produced from.
    pub fn analyzed_sources(&self) -> impl Iterator<Item = (&ExtractedSource, &AnalysisResult)> {
        self.extracted.iter().zip(self.analyses.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(title: &str, score: f64, themes: &[&str]) -> AnalysisResult {
        AnalysisResult {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            summary: String::new(),
            key_finding: format!("finding from {title}"),
            relevance_score: score,
            themes: themes.iter().map(|t| t.to_string()).collect(),
            word_count: 100,
            extraction_method: ExtractionDepth::Normal,
            analysis_method: AnalysisMethod::Normal,
        }
    }

    #[test]
    fn themes_aggregate_by_support_with_source_titles() {
        let a = vec![
            analysis("a", 7.0, &["Solar", "Storage"]),
            analysis("b", 6.0, &["Wind", "Solar"]),
            analysis("c", 2.0, &["Storage", "Solar"]),
        ];
        let themes = Theme::aggregate(&a, 5);
        assert_eq!(themes[0].name, "Solar");
        assert_eq!(themes[0].support_count, 3);
        assert_eq!(themes[0].supporting_source_titles, vec!["a", "b", "c"]);
        assert_eq!(themes[1].name, "Storage");
        assert_eq!(themes[1].supporting_source_titles, vec!["a", "c"]);
        assert_eq!(themes[2].name, "Wind");

        let top1 = Theme::aggregate(&a, 1);
        assert_eq!(top1.len(), 1);
    }

    #[test]
    fn depth_marker_combines_both_axes() {
        let mut a = analysis("a", 5.0, &[]);
        assert_eq!(a.depth_marker(), "N/N");
        a.extraction_method = ExtractionDepth::Deep;
        a.analysis_method = AnalysisMethod::Enhanced;
        assert_eq!(a.depth_marker(), "D/E");
    }

    #[test]
    fn high_relevance_count_uses_inclusive_threshold() {
        let mut s = ResearchSession::new("q", OutputLanguage::English);
        s.analyses = vec![
            analysis("a", 7.2, &[]),
            analysis("b", 3.1, &[]),
            analysis("c", 8.0, &[]),
            analysis("d", 4.5, &[]),
            analysis("e", 5.0, &[]),
        ];
        assert_eq!(s.high_relevance_count(5.0), 3);
        assert!(s.final_summary.is_empty());
    }

    #[test]
    fn depth_enums_serialize_snake_case() {
        let v = serde_json::to_value(ExtractionDepth::Deep).unwrap();
        assert_eq!(v.as_str(), Some("deep"));
        let v = serde_json::to_value(AnalysisMethod::Enhanced).unwrap();
        assert_eq!(v.as_str(), Some("enhanced"));
    }
}
