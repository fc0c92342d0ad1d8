//! Phase 5: markdown rendering of a finished session.

use crate::config::ResearchConfig;
use crate::language::{Labels, OutputLanguage};
use crate::session::{AnalysisMethod, AnalysisResult, ExtractionDepth, ResearchSession};
use crate::synthesis::FINDING_SCORE_FLOOR;
use crate::textstats::{clip_with_ellipsis, rank_by_frequency, truncate_chars};
use chrono::{DateTime, Utc};
use researchpipe_core::ImageRef;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

pub const MAX_KEY_FINDINGS: usize = 6;
pub const MAX_REPORT_THEMES: usize = 8;
pub const MAX_THEME_SOURCES: usize = 3;
pub const MAX_REPORT_IMAGES: usize = 12;
pub const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStatistics {
    pub sources_analyzed: usize,
    pub total_words: usize,
    pub average_relevance: f64,
    pub high_relevance: usize,
    pub medium_relevance: usize,
    pub low_relevance: usize,
    pub unique_themes: usize,
    pub images_found: usize,
}

impl ReportStatistics {
    pub fn compute(analyses: &[AnalysisResult], threshold: f64, images_found: usize) -> Self {
        let n = analyses.len();
        let average_relevance = if n == 0 {
            0.0
        } else {
            analyses.iter().map(|a| a.relevance_score).sum::<f64>() / n as f64
        };
        let high = analyses
            .iter()
            .filter(|a| a.relevance_score >= threshold)
            .count();
        let medium = analyses
            .iter()
            .filter(|a| (FINDING_SCORE_FLOOR..threshold).contains(&a.relevance_score))
            .count();
        let low = analyses
            .iter()
            .filter(|a| a.relevance_score < FINDING_SCORE_FLOOR)
            .count();
        let unique: BTreeSet<&str> = analyses
            .iter()
            .flat_map(|a| a.themes.iter().map(String::as_str))
            .collect();
        Self {
            sources_analyzed: n,
            total_words: analyses.iter().map(|a| a.word_count).sum(),
            average_relevance,
            high_relevance: high,
            medium_relevance: medium,
            low_relevance: low,
            unique_themes: unique.len(),
            images_found,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub title: String,
    pub language: OutputLanguage,
    pub statistics: ReportStatistics,
    pub markdown: String,
}

/// Renders sessions; a pure function of the session and the language.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    config: ResearchConfig,
}

impl ReportAssembler {
    pub fn new(config: ResearchConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, session: &ResearchSession, language: OutputLanguage) -> ResearchReport {
        let labels = language.labels();
        let threshold = self.config.relevance_threshold;
        let images: &[ImageRef] = if self.config.include_images {
            session.images.as_slice()
        } else {
            &[]
        };
        let stats = ReportStatistics::compute(&session.analyses, threshold, images.len());
        let title = format!("{}: {}", labels.research_report, session.query);

        let mut md = String::new();
        self.header(&mut md, &title, session, &stats, language);
        section(&mut md, labels.executive_summary);
        let _ = writeln!(md, "{}\n", session.final_summary.trim());
        self.key_findings(&mut md, &session.analyses, labels);
        self.themes(&mut md, &session.analyses, labels);
        if !images.is_empty() {
            self.images(&mut md, images, labels);
        }
        self.source_details(&mut md, session, labels);
        self.index_table(&mut md, &session.analyses, labels);
        self.statistics(&mut md, session, &stats, language);

        ResearchReport {
            title,
            language,
            statistics: stats,
            markdown: md,
        }
    }

    fn header(
        &self,
        md: &mut String,
        title: &str,
        session: &ResearchSession,
        stats: &ReportStatistics,
        language: OutputLanguage,
    ) {
        let labels = language.labels();
        let _ = writeln!(md, "# {title}\n");
        let _ = writeln!(
            md,
            "**{}:** {}  ",
            labels.generated,
            session.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if let Some(model) = &session.model {
            let _ = writeln!(md, "**{}:** {}  ", labels.model, model);
        }
        let _ = writeln!(md, "**{}:** {}  ", labels.language, language.display_name());
        let _ = writeln!(md, "**{}:** {}  ", labels.sources_analyzed, stats.sources_analyzed);
        let _ = writeln!(md, "**{}:** {}\n", labels.images_found, stats.images_found);
        if !session.advisories.is_empty() {
            let _ = writeln!(md, "> **{}:**", labels.advisories);
            for a in &session.advisories {
                let _ = writeln!(md, "> - {a}");
            }
            md.push('\n');
        }
    }

    /// Highest scores first; ties keep source order.
    fn key_findings(&self, md: &mut String, analyses: &[AnalysisResult], labels: &Labels) {
        let floor = self.config.key_finding_floor();
        let mut picked: Vec<&AnalysisResult> = analyses
            .iter()
            .filter(|a| a.relevance_score >= floor)
            .collect();
        picked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        picked.truncate(MAX_KEY_FINDINGS);

        section(md, labels.key_findings);
        for (i, a) in picked.iter().enumerate() {
            let _ = writeln!(md, "### {} {}\n", labels.finding, i + 1);
            let _ = writeln!(
                md,
                "**{}:** {:.1}/10  ",
                labels.relevance_score, a.relevance_score
            );
            let _ = writeln!(md, "**{}:** {}\n", labels.source, a.title);
            let _ = writeln!(md, "{}\n", a.key_finding);
        }
    }

    fn themes(&self, md: &mut String, analyses: &[AnalysisResult], labels: &Labels) {
        let ranked = rank_by_frequency(analyses.iter().flat_map(|a| a.themes.iter()));
        if ranked.is_empty() {
            return;
        }
        section(md, labels.identified_themes);
        for (theme, count) in ranked.into_iter().take(MAX_REPORT_THEMES) {
            let titles: Vec<String> = analyses
                .iter()
                .filter(|a| a.themes.contains(&theme))
                .take(MAX_THEME_SOURCES)
                .map(|a| truncate_chars(&a.title, 50))
                .collect();
            let _ = writeln!(md, "### {theme}\n");
            let _ = writeln!(md, "**{}:** {}  ", labels.supporting_sources, count);
            let _ = writeln!(md, "**{}:** {}\n", labels.sources_found, titles.join(", "));
        }
    }

    fn images(&self, md: &mut String, images: &[ImageRef], labels: &Labels) {
        section(md, labels.relevant_images);
        for (i, img) in images.iter().take(MAX_REPORT_IMAGES).enumerate() {
            let n = i + 1;
            if img.alt.trim().is_empty() {
                let _ = writeln!(md, "### {} {n}\n", labels.image);
            } else {
                let _ = writeln!(
                    md,
                    "### {} {n}: {}\n",
                    labels.image,
                    truncate_chars(img.alt.trim(), 100)
                );
            }
            let _ = writeln!(md, "{}\n", img.markdown());
        }
    }

    fn source_details(&self, md: &mut String, session: &ResearchSession, labels: &Labels) {
        section(md, labels.detailed_source_analysis);
        for (i, a) in session.analyses.iter().enumerate() {
            let _ = writeln!(md, "### {}. {}\n", i + 1, a.title);
            let _ = writeln!(md, "**URL:** {}  ", a.url);
            let _ = writeln!(
                md,
                "**{}:** {:.1}/10  ",
                labels.relevance_score, a.relevance_score
            );
            let _ = writeln!(md, "**{}:** {}  ", labels.word_count, a.word_count);
            let extraction = match a.extraction_method {
                ExtractionDepth::Normal => labels.normal,
                ExtractionDepth::Deep => labels.deep,
            };
            let analysis = match a.analysis_method {
                AnalysisMethod::Normal => labels.standard,
                AnalysisMethod::Enhanced => labels.enhanced,
            };
            let _ = writeln!(
                md,
                "**{}:** {extraction} | **{}:** {analysis}\n",
                labels.extraction, labels.analysis
            );
            let _ = writeln!(md, "#### {}\n\n{}\n", labels.summary, a.summary);
            let _ = writeln!(md, "#### {}\n\n{}\n", labels.key_findings, a.key_finding);
            if !a.themes.is_empty() {
                let _ = writeln!(
                    md,
                    "**{}:** {}\n",
                    labels.identified_themes,
                    a.themes.join(", ")
                );
            }
            let preview = session
                .extracted
                .get(i)
                .map(|s| clip_with_ellipsis(s.content.trim(), PREVIEW_CHARS))
                .unwrap_or_default();
            if !preview.is_empty() {
                let _ = writeln!(md, "#### {}\n\n```\n{preview}\n```\n", labels.content_preview);
            }
        }
    }

    fn index_table(&self, md: &mut String, analyses: &[AnalysisResult], labels: &Labels) {
        section(md, labels.all_search_results);
        let _ = writeln!(
            md,
            "| # | {} | {} | {} | {} |",
            labels.source, labels.relevance_score, labels.word_count, labels.depth
        );
        let _ = writeln!(md, "|---|---|---|---|---|");
        for (i, a) in analyses.iter().enumerate() {
            let title = truncate_chars(&a.title, 40).replace('|', "\\|");
            let _ = writeln!(
                md,
                "| {} | [{}]({}) | {:.1} | {} | {} |",
                i + 1,
                title,
                a.url,
                a.relevance_score,
                a.word_count,
                a.depth_marker()
            );
        }
        let _ = writeln!(md, "\n*{}*\n", labels.depth_legend);
    }

    fn statistics(
        &self,
        md: &mut String,
        session: &ResearchSession,
        stats: &ReportStatistics,
        language: OutputLanguage,
    ) {
        let labels = language.labels();
        let _ = writeln!(md, "### {}\n", labels.research_statistics);
        let _ = writeln!(md, "- **{}:** {}", labels.total_words, stats.total_words);
        let _ = writeln!(
            md,
            "- **{}:** {:.1}/10",
            labels.average_relevance, stats.average_relevance
        );
        let _ = writeln!(
            md,
            "- **{}:** {}/{}",
            labels.high_relevance_sources,
            stats.high_relevance,
            session.analyses.len()
        );
        let _ = writeln!(
            md,
            "- **{}:** {}: {}, {}: {}, {}: {}",
            labels.relevance_distribution,
            labels.high,
            stats.high_relevance,
            labels.medium,
            stats.medium_relevance,
            labels.low,
            stats.low_relevance
        );
        let _ = writeln!(md, "- **{}:** {}", labels.unique_themes, stats.unique_themes);
        let _ = writeln!(md, "- **{}:** {}", labels.language, language.display_name());
        let _ = writeln!(md, "\n---\n\n*{}*", labels.footer);
    }
}

fn section(md: &mut String, heading: &str) {
    let _ = writeln!(md, "---\n\n## {heading}\n");
}

/// `research_<query>_<model>_<YYYYmmdd_HHMM>_<en|zh>.md`
pub fn auto_filename(
    query: &str,
    model: &str,
    language: OutputLanguage,
    at: DateTime<Utc>,
) -> String {
    let safe: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe: String = safe.trim_end().replace(' ', "_").chars().take(50).collect();
    let model = model.replace([':', '/'], "_");
    format!(
        "research_{safe}_{model}_{}_{}.md",
        at.format("%Y%m%d_%H%M"),
        language.file_suffix()
    )
}
