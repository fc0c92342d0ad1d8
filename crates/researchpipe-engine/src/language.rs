//! Output-language tables: report labels and prompt templates.
//!
//! Both are selected by the same `OutputLanguage` value, so a session never mixes languages
//! between the prompts it sends and the report it renders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLanguage {
    #[default]
    English,
    Chinese,
}

impl OutputLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Chinese => "chinese",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Chinese => "中文",
        }
    }

    /// Short code used in generated file names.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh",
        }
    }

    pub fn labels(self) -> &'static Labels {
        match self {
            Self::English => &ENGLISH_LABELS,
            Self::Chinese => &CHINESE_LABELS,
        }
    }

    pub fn prompts(self) -> Prompts {
        Prompts { language: self }
    }
}

impl fmt::Display for OutputLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "chinese" | "zh" | "zh-cn" => Ok(Self::Chinese),
            other => Err(format!(
                "unknown output language {other:?} (allowed: english, chinese)"
            )),
        }
    }
}

/// Report vocabulary for one language.
#[derive(Debug)]
pub struct Labels {
    pub research_report: &'static str,
    pub generated: &'static str,
    pub model: &'static str,
    pub language: &'static str,
    pub sources_analyzed: &'static str,
    pub images_found: &'static str,
    pub executive_summary: &'static str,
    pub key_findings: &'static str,
    pub finding: &'static str,
    pub source: &'static str,
    pub relevance_score: &'static str,
    pub relevant_images: &'static str,
    pub image: &'static str,
    pub identified_themes: &'static str,
    pub supporting_sources: &'static str,
    pub sources_found: &'static str,
    pub detailed_source_analysis: &'static str,
    pub word_count: &'static str,
    pub summary: &'static str,
    pub content_preview: &'static str,
    pub all_search_results: &'static str,
    pub depth: &'static str,
    pub extraction: &'static str,
    pub analysis: &'static str,
    pub normal: &'static str,
    pub deep: &'static str,
    pub standard: &'static str,
    pub enhanced: &'static str,
    pub depth_legend: &'static str,
    pub relevance_distribution: &'static str,
    pub high: &'static str,
    pub medium: &'static str,
    pub low: &'static str,
    pub research_statistics: &'static str,
    pub total_words: &'static str,
    pub average_relevance: &'static str,
    pub high_relevance_sources: &'static str,
    pub unique_themes: &'static str,
    pub advisories: &'static str,
    pub mentioned_times: &'static str,
    pub fallback_header: &'static str,
    pub fallback_notice: &'static str,
    pub query: &'static str,
    pub findings_collected: &'static str,
    pub no_findings: &'static str,
    pub footer: &'static str,
}

pub static ENGLISH_LABELS: Labels = Labels {
    research_report: "Research Report",
    generated: "Generated",
    model: "Model",
    language: "Language",
    sources_analyzed: "Sources Analyzed",
    images_found: "Images Found",
    executive_summary: "Executive Summary",
    key_findings: "Key Findings",
    finding: "Finding",
    source: "Source",
    relevance_score: "Relevance Score",
    relevant_images: "Relevant Images",
    image: "Image",
    identified_themes: "Identified Themes",
    supporting_sources: "Supporting Sources",
    sources_found: "Sources Found",
    detailed_source_analysis: "Detailed Source Analysis",
    word_count: "Word Count",
    summary: "Summary",
    content_preview: "Content Preview",
    all_search_results: "All Search Results",
    depth: "Depth",
    extraction: "Extraction",
    analysis: "Analysis",
    normal: "Normal",
    deep: "Deep",
    standard: "Standard",
    enhanced: "Enhanced",
    depth_legend: "Depth Legend: N/N=Normal, D/N=Deep Extract, N/E=Enhanced Analysis, D/E=Deep+Enhanced",
    relevance_distribution: "Relevance Distribution",
    high: "High",
    medium: "Medium",
    low: "Low",
    research_statistics: "Research Statistics",
    total_words: "Total Words Analyzed",
    average_relevance: "Average Relevance Score",
    high_relevance_sources: "High Relevance Sources",
    unique_themes: "Unique Themes Identified",
    advisories: "Advisories",
    mentioned_times: "mentioned {n} times",
    fallback_header: "Research Summary (generated under technical difficulties)",
    fallback_notice: "The language service could not produce a narrative summary, so the findings collected from each source are listed directly below.",
    query: "Query",
    findings_collected: "Findings Collected",
    no_findings: "No findings were collected.",
    footer: "Research Report generated by researchpipe",
};

pub static CHINESE_LABELS: Labels = Labels {
    research_report: "研究报告",
    generated: "生成时间",
    model: "模型",
    language: "语言",
    sources_analyzed: "已分析来源",
    images_found: "发现图片",
    executive_summary: "执行摘要",
    key_findings: "关键发现",
    finding: "发现",
    source: "来源",
    relevance_score: "相关性评分",
    relevant_images: "相关图片",
    image: "图片",
    identified_themes: "识别主题",
    supporting_sources: "支持来源",
    sources_found: "发现来源",
    detailed_source_analysis: "详细来源分析",
    word_count: "字数统计",
    summary: "摘要",
    content_preview: "内容预览",
    all_search_results: "所有搜索结果",
    depth: "深度",
    extraction: "提取",
    analysis: "分析",
    normal: "正常",
    deep: "深度",
    standard: "标准",
    enhanced: "增强",
    depth_legend: "深度图例: N/N=正常, D/N=深度提取, N/E=增强分析, D/E=深度+增强",
    relevance_distribution: "相关性分布",
    high: "高",
    medium: "中",
    low: "低",
    research_statistics: "研究统计",
    total_words: "分析总字数",
    average_relevance: "平均相关性评分",
    high_relevance_sources: "高相关性来源",
    unique_themes: "识别的独立主题",
    advisories: "提示",
    mentioned_times: "提及 {n} 次",
    fallback_header: "研究摘要（技术故障下生成）",
    fallback_notice: "语言服务未能生成叙述性摘要，以下直接列出从各来源收集的发现。",
    query: "查询",
    findings_collected: "收集的发现",
    no_findings: "未收集到任何发现。",
    footer: "研究报告由 researchpipe 生成",
};

impl Labels {
    pub fn mentioned(&self, n: usize) -> String {
        self.mentioned_times.replace("{n}", &n.to_string())
    }
}

/// Prompt templates for one language.
#[derive(Debug, Clone, Copy)]
pub struct Prompts {
    language: OutputLanguage,
}

impl Prompts {
    pub fn language(&self) -> OutputLanguage {
        self.language
    }

    pub fn source_summary(&self, query: &str, title: &str, content: &str) -> String {
        match self.language {
            OutputLanguage::English => format!(
                "Summarize key points from this source relevant to \"{query}\":\n\n\
                 Source: {title}\n\
                 Content: {content}\n\n\
                 Provide 2-3 sentences focusing on the most relevant information."
            ),
            OutputLanguage::Chinese => format!(
                "总结此来源中与\"{query}\"相关的要点：\n\n\
                 来源：{title}\n\
                 内容：{content}\n\n\
                 请提供2-3句话，重点关注最相关的信息。"
            ),
        }
    }

    pub fn enhanced_summary(&self, query: &str, title: &str, content: &str) -> String {
        match self.language {
            OutputLanguage::English => format!(
                "Perform an enhanced deep analysis of this source for the query \"{query}\":\n\n\
                 Source: {title}\n\
                 Content: {content}\n\n\
                 Please provide:\n\
                 1. Key points directly relevant to the query\n\
                 2. Secondary insights that might be related\n\
                 3. Important context or background information\n\
                 4. Any actionable findings\n\n\
                 Provide a comprehensive 4-5 sentence summary focusing on maximizing relevance to the research query."
            ),
            OutputLanguage::Chinese => format!(
                "对此来源进行关于\"{query}\"查询的增强深度分析：\n\n\
                 来源：{title}\n\
                 内容：{content}\n\n\
                 请提供：\n\
                 1. 与查询直接相关的要点\n\
                 2. 可能相关的次要见解\n\
                 3. 重要的背景信息或上下文\n\
                 4. 任何可操作的发现\n\n\
                 请提供一个全面的4-5句话摘要，重点最大化与研究查询的相关性。"
            ),
        }
    }

    pub fn key_finding(&self, query: &str, title: &str, content: &str) -> String {
        match self.language {
            OutputLanguage::English => format!(
                "Extract the most important finding about \"{query}\" from this source:\n\n\
                 Source: {title}\n\
                 Content: {content}\n\n\
                 Provide one key finding in 1-2 sentences."
            ),
            OutputLanguage::Chinese => format!(
                "从此来源中提取关于\"{query}\"最重要的发现：\n\n\
                 来源：{title}\n\
                 内容：{content}\n\n\
                 用1-2句话提供一个关键发现。"
            ),
        }
    }

    pub fn final_summary(&self, query: &str, findings: &str, themes: &str) -> String {
        match self.language {
            OutputLanguage::English => format!(
                "Create a comprehensive research summary for: \"{query}\"\n\n\
                 Key Findings:\n{findings}\n\n\
                 Main Themes:\n{themes}\n\n\
                 Structure your response as markdown:\n\n\
                 ## Executive Summary\n\
                 2-3 sentences overview of key insights.\n\n\
                 ## Key Findings\n\
                 - List 3-5 most important discoveries\n\
                 - Include supporting evidence\n\n\
                 ## Main Themes\n\
                 Brief analysis of identified patterns\n\n\
                 ## Conclusions\n\
                 Main takeaways and recommendations.\n\n\
                 Keep response focused and under 500 words."
            ),
            OutputLanguage::Chinese => format!(
                "为\"{query}\"创建综合研究摘要\n\n\
                 关键发现：\n{findings}\n\n\
                 主要主题：\n{themes}\n\n\
                 请用Markdown格式构建回应：\n\n\
                 ## 执行摘要\n\
                 2-3句话概述关键见解。\n\n\
                 ## 关键发现\n\
                 - 列出3-5个最重要的发现\n\
                 - 包含支持证据\n\n\
                 ## 主要主题\n\
                 对识别模式的简要分析\n\n\
                 ## 结论\n\
                 主要要点和建议。\n\n\
                 保持回应重点突出且在500字以内。"
            ),
        }
    }

    /// Shorter synthesis prompt used after a failed attempt.
    pub fn condensed_summary(&self, query: &str, findings: &str) -> String {
        match self.language {
            OutputLanguage::English => format!(
                "Summarize the research on \"{query}\" based on these findings:\n\n\
                 {findings}\n\n\
                 Write a short markdown summary with an overview and the main conclusions. \
                 Keep it under 300 words."
            ),
            OutputLanguage::Chinese => format!(
                "根据以下发现总结关于\"{query}\"的研究：\n\n\
                 {findings}\n\n\
                 请用Markdown写一个简短摘要，包括概述和主要结论。保持在300字以内。"
            ),
        }
    }
}
