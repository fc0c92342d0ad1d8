use crate::llm::{env, lines, options_from_env, LlmOptions};
use futures_util::StreamExt;
use researchpipe_core::{Error, Result, TextGenerator, TextStream};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama2";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    options: LlmOptions,
}

impl OllamaClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        options: LlmOptions,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            options,
        }
    }

    /// `RESEARCHPIPE_OLLAMA_BASE_URL`, `RESEARCHPIPE_OLLAMA_MODEL`, plus the
    /// `RESEARCHPIPE_OLLAMA_{TEMPERATURE,MAX_TOKENS,TIMEOUT_MS}` knobs.
    pub fn from_env(client: reqwest::Client) -> Self {
        let base_url = env("RESEARCHPIPE_OLLAMA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());
        let model =
            env("RESEARCHPIPE_OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        let options = options_from_env("RESEARCHPIPE_OLLAMA_", LlmOptions::default());
        Self::new(client, base_url, model, options)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_chat(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    fn request(&self, prompt: &str, system: Option<&str>, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });
        ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
            options: ChatOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            },
        }
    }

    async fn send(&self, req: &ChatRequest) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(self.endpoint_chat())
            .timeout(std::time::Duration::from_millis(self.options.timeout_ms))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!("ollama chat HTTP {status}")));
        }
        Ok(resp)
    }
}

/// One NDJSON line of a streamed chat: a content fragment, or an error.
fn parse_chunk(line: &str) -> Option<Result<String>> {
    if line.trim().is_empty() {
        return None;
    }
    let chunk: ChatChunk = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => return Some(Err(Error::Llm(format!("bad ollama stream line: {e}")))),
    };
    if let Some(err) = chunk.error {
        return Some(Err(Error::Llm(err)));
    }
    chunk
        .message
        .map(|m| m.content)
        .filter(|c| !c.is_empty())
        .map(Ok)
}

#[async_trait::async_trait]
impl TextGenerator for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let resp = self.send(&self.request(prompt, system, false)).await?;
        let parsed: ChatResponse = resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        tracing::debug!(
            model = %self.model,
            chars = parsed.message.content.chars().count(),
            "ollama chat completed"
        );
        Ok(parsed.message.content)
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let resp = self.send(&self.request(prompt, system, true)).await?;
        let fragments = lines(resp.bytes_stream().boxed())
            .filter_map(|line| async move {
                match line {
                    Ok(l) => parse_chunk(&l),
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed();
        Ok(fragments)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Clone, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChunk {
    message: Option<ChatMessage>,
    error: Option<String>,
}
