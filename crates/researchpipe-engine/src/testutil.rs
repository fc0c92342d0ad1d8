//! In-process collaborator fakes shared by the engine's unit tests.

use crate::session::{AnalysisMethod, AnalysisResult, ExtractionDepth};
use researchpipe_core::{
    BrowserBackend, Error, ExtractRequest, ExtractionResult, ImageCandidate, PageSnapshot, Result,
    SearchProvider, SearchQuery, SearchResponse, SearchResult, TextGenerator,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Per-URL queue of extraction results; records `(url, max_length)` for every call.
#[derive(Default)]
pub(crate) struct ScriptedBrowser {
    pub scripts: Mutex<HashMap<String, Vec<ExtractionResult>>>,
    pub calls: Mutex<Vec<(String, usize)>>,
    pub images: Vec<ImageCandidate>,
}

impl ScriptedBrowser {
    pub(crate) fn script(self, url: &str, results: Vec<ExtractionResult>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), results);
        self
    }

    pub(crate) fn calls_for(&self, url: &str) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, n)| *n)
            .collect()
    }
}

#[async_trait::async_trait]
impl BrowserBackend for ScriptedBrowser {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot> {
        if url.contains("broken") {
            return Err(Error::Browser("navigation failed".to_string()));
        }
        Ok(PageSnapshot {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            title: "Page".to_string(),
            rendered_text: String::new(),
            links: Vec::new(),
            images: self.images.clone(),
        })
    }

    async fn extract(&self, req: &ExtractRequest) -> ExtractionResult {
        self.calls
            .lock()
            .unwrap()
            .push((req.url.clone(), req.max_length));
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&req.url) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            Some(_) => ExtractionResult::error("script exhausted"),
            None => ExtractionResult::error("navigation failed"),
        }
    }
}

pub(crate) fn words(n: usize) -> String {
    vec!["solar"; n].join(" ")
}

pub(crate) fn ok(content: String) -> ExtractionResult {
    ExtractionResult::Success {
        title: "Page".to_string(),
        content,
        truncated: false,
    }
}

type Reply = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Language model fake driven by a closure over the prompt; records every prompt.
pub(crate) struct FakeLlm {
    reply: Reply,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub(crate) fn with(reply: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::with(move |_| Ok(text.clone()))
    }

    pub(crate) fn failing() -> Self {
        Self::with(|_| Err(Error::Llm("connection refused".to_string())))
    }

    pub(crate) fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for FakeLlm {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.reply)(prompt)
    }
}

pub(crate) struct FixedProvider {
    pub results: Vec<SearchResult>,
}

#[async_trait::async_trait]
impl SearchProvider for FixedProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn search(&self, _q: &SearchQuery) -> Result<SearchResponse> {
        Ok(SearchResponse {
            results: self.results.clone(),
            provider: "fixed".to_string(),
            timings_ms: BTreeMap::new(),
        })
    }
}

pub(crate) fn hit(title: &str, url: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: url.to_string(),
        description: String::new(),
    }
}

pub(crate) fn analysis(title: &str, score: f64, finding: &str, themes: &[&str]) -> AnalysisResult {
    AnalysisResult {
        title: title.to_string(),
        url: format!("https://example.com/{}", title.replace(' ', "-")),
        summary: format!("Summary of {title}."),
        key_finding: finding.to_string(),
        relevance_score: score,
        themes: themes.iter().map(|t| t.to_string()).collect(),
        word_count: 400,
        extraction_method: ExtractionDepth::Normal,
        analysis_method: AnalysisMethod::Normal,
    }
}
