use researchpipe_core::{Error, Result};

pub mod browser;
pub mod extract;
pub mod images;
pub mod links;
pub mod llm;
pub mod ollama;
pub mod openai_compat;
pub mod search;

pub use browser::{BrowserOptions, HttpBrowser};
pub use images::ContentImageFilter;
pub use llm::LlmOptions;
pub use ollama::OllamaClient;
pub use openai_compat::OpenAiCompatClient;
pub use search::{DuckDuckGoSearchProvider, SearxngSearchProvider};

/// Shared HTTP client for search and LLM calls; per-request timeouts are set by callers.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| Error::NotConfigured(format!("http client: {e}")))
}
