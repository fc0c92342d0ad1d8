use crate::extract::{clean_content, filter_by_query, main_text, page_title, truncate_with_ellipsis};
use crate::links::{extract_image_candidates, extract_links};
use futures_util::StreamExt;
use html_scraper::Html;
use researchpipe_core::{
    BrowserBackend, Error, ExtractRequest, ExtractionResult, PageSnapshot, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) researchpipe/0.1";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub timeout_ms: u64,
    pub max_bytes: usize,
    pub user_agent: String,
    pub max_links: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_bytes: 5_000_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_links: 200,
        }
    }
}

#[derive(Debug)]
struct LoadedPage {
    url: String,
    final_url: String,
    status: u16,
    html: String,
}

/// Plain-HTTP browser: fetches pages with reqwest and reads them with scraper.
///
/// Keeps the last loaded page as its "current page", so repeated calls for the same URL
/// (a deeper extraction, the image pass) reuse one fetch. Drive it from a single task.
pub struct HttpBrowser {
    client: reqwest::Client,
    options: BrowserOptions,
    current: Mutex<Option<Arc<LoadedPage>>>,
}

impl HttpBrowser {
    pub fn new(options: BrowserOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| Error::Browser(e.to_string()))?;
        Ok(Self::with_client(client, options))
    }

    pub fn with_client(client: reqwest::Client, options: BrowserOptions) -> Self {
        Self {
            client,
            options,
            current: Mutex::new(None),
        }
    }

    /// Drops the memoized page.
    pub async fn reset(&self) {
        *self.current.lock().await = None;
    }

    async fn load(&self, url: &str) -> Result<Arc<LoadedPage>> {
        let mut current = self.current.lock().await;
        if let Some(page) = current.as_ref().filter(|p| p.url == url) {
            tracing::trace!(url, "reusing current page");
            return Ok(page.clone());
        }
        let page = Arc::new(self.fetch(url).await?);
        *current = Some(page.clone());
        Ok(page)
    }

    async fn fetch(&self, url: &str) -> Result<LoadedPage> {
        let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(parsed)
            .timeout(Duration::from_millis(self.options.timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {status} for {url}")));
        }
        let final_url = resp.url().to_string();

        let max_bytes = self.options.max_bytes;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                tracing::debug!(url, max_bytes, "page body truncated");
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        tracing::debug!(
            url,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "page loaded"
        );
        Ok(LoadedPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            html: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    fn snapshot(&self, page: &LoadedPage) -> PageSnapshot {
        let doc = Html::parse_document(&page.html);
        PageSnapshot {
            url: page.url.clone(),
            final_url: page.final_url.clone(),
            status: page.status,
            title: page_title(&doc),
            rendered_text: clean_content(&main_text(&doc, &page.html)),
            links: extract_links(&doc, Some(&page.final_url), self.options.max_links),
            images: extract_image_candidates(&doc),
        }
    }
}

/// Title, bounded content and the truncation flag for one page and request.
pub fn extract_content(html: &str, query: Option<&str>, max_length: usize) -> (String, String, bool) {
    let doc = Html::parse_document(html);
    let title = page_title(&doc);
    let mut text = clean_content(&main_text(&doc, html));
    if let Some(q) = query {
        text = filter_by_query(&text, q, max_length);
    }
    let (content, truncated) = truncate_with_ellipsis(&text, max_length);
    (title, content, truncated)
}

#[async_trait::async_trait]
impl BrowserBackend for HttpBrowser {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot> {
        let page = self.load(url).await?;
        Ok(self.snapshot(&page))
    }

    async fn extract(&self, req: &ExtractRequest) -> ExtractionResult {
        let page = match self.load(&req.url).await {
            Ok(p) => p,
            Err(e) => return ExtractionResult::error(e.to_string()),
        };
        let (title, content, truncated) =
            extract_content(&page.html, req.query.as_deref(), req.max_length);
        tracing::debug!(
            url = %req.url,
            chars = content.chars().count(),
            max_length = req.max_length,
            truncated,
            "extracted page content"
        );
        ExtractionResult::Success {
            title,
            content,
            truncated,
        }
    }
}
