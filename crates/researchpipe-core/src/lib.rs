use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("browser failed: {0}")]
    Browser(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("not supported: {0}")]
    NotSupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
    pub language: Option<String>,
    /// Per-request timeout; providers clamp this to a sane range.
    pub timeout_ms: Option<u64>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            language: None,
            timeout_ms: None,
        }
    }
}

/// One ranked candidate returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Provider ranking order.
    pub results: Vec<SearchResult>,
    pub provider: String,
    pub timings_ms: BTreeMap<String, u128>,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse>;
}

/// A raw `<img>` candidate as seen on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// `src` attribute as written in the page (may be relative).
    pub src: String,
    pub alt: Option<String>,
}

/// A content-relevant image with an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
    pub source_page: String,
}

impl ImageRef {
    pub fn markdown(&self) -> String {
        format!("![{}]({})", self.alt, self.url)
    }
}

/// Picks likely content images out of a page's raw `<img>` candidates.
pub trait ImageFilter: Send + Sync {
    fn select(&self, page_url: &str, candidates: &[ImageCandidate]) -> Vec<ImageRef>;
}

/// What a browser sees after navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub title: String,
    /// Visible text, whitespace-normalized, not query filtered.
    pub rendered_text: String,
    pub links: Vec<String>,
    pub images: Vec<ImageCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
    /// When set, the backend keeps the parts of the page that mention the query.
    pub query: Option<String>,
    /// Character budget for the returned content.
    pub max_length: usize,
}

/// Outcome of a single content extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success {
        title: String,
        content: String,
        truncated: bool,
    },
    Error {
        message: String,
    },
}

impl ExtractionResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Browser-automation collaborator.
///
/// Implementations may keep per-session state (a current page), so callers own the handle
/// and drive it from a single task.
#[async_trait::async_trait]
pub trait BrowserBackend: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot>;

    /// Navigation and transport failures are reported as `ExtractionResult::Error`.
    async fn extract(&self, req: &ExtractRequest) -> ExtractionResult;
}

pub type TextStream = BoxStream<'static, Result<String>>;

/// Text-generation collaborator. Stateless per call.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for reports and logs.
    fn model(&self) -> &str;

    fn supports_streaming(&self) -> bool {
        false
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;

    /// Ordered fragments whose concatenation equals what `generate` returns.
    ///
    /// The default yields the whole completion as a single fragment.
    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let text = self.generate(prompt, system).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }
}
