use crate::llm::{env, lines, options_from_env, LlmOptions};
use futures_util::{future, StreamExt};
use researchpipe_core::{Error, Result, TextGenerator, TextStream};
use serde::{Deserialize, Serialize};

/// Client for any server speaking the OpenAI `/v1/chat/completions` dialect.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    options: LlmOptions,
}

impl OpenAiCompatClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        options: LlmOptions,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            options,
        }
    }

    pub fn from_env(client: reqwest::Client, model_override: Option<String>) -> Result<Self> {
        let base_url = env("RESEARCHPIPE_OPENAI_COMPAT_BASE_URL").ok_or_else(|| {
            Error::NotConfigured("missing RESEARCHPIPE_OPENAI_COMPAT_BASE_URL".to_string())
        })?;
        let api_key = env("RESEARCHPIPE_OPENAI_COMPAT_API_KEY");
        let model = model_override
            .or_else(|| env("RESEARCHPIPE_OPENAI_COMPAT_MODEL"))
            .ok_or_else(|| {
                Error::NotConfigured(
                    "missing model for openai_compat (set llm.model or RESEARCHPIPE_OPENAI_COMPAT_MODEL)"
                        .to_string(),
                )
            })?;
        let options = options_from_env("RESEARCHPIPE_OPENAI_COMPAT_", LlmOptions::default());
        Ok(Self::new(client, base_url, api_key, model, options))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn send(&self, prompt: &str, system: Option<&str>, stream: bool) -> Result<reqwest::Response> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: prompt.to_string(),
        });
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            stream,
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(std::time::Duration::from_millis(self.options.timeout_ms))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }
        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "openai_compat chat.completions HTTP {status}"
            )));
        }
        Ok(resp)
    }
}

fn is_done(line: &Result<String>) -> bool {
    matches!(line, Ok(l) if l.trim() == "data: [DONE]")
}

/// Content delta carried by one SSE line, if any.
fn parse_sse_line(line: &str) -> Option<Result<String>> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(e) => return Some(Err(Error::Llm(format!("bad completion chunk: {e}")))),
    };
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map(Ok)
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiCompatClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let resp = self.send(prompt, system, false).await?;
        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let resp = self.send(prompt, system, true).await?;
        let fragments = lines(resp.bytes_stream().boxed())
            .take_while(|line| future::ready(!is_done(line)))
            .filter_map(|line| async move {
                match line {
                    Ok(l) => parse_sse_line(&l),
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed();
        Ok(fragments)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Clone, Deserialize)]
struct Delta {
    content: Option<String>,
}
