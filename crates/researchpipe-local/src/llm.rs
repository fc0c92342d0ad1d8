//! Pieces shared by the chat-completion clients.

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use researchpipe_core::{Error, Result};
use std::collections::VecDeque;

/// Sampling and transport knobs applied to every request of a client.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub timeout_ms: u64,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(2048),
            timeout_ms: 120_000,
        }
    }
}

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env(key).and_then(|s| s.parse::<T>().ok())
}

/// Overrides `base` with `<prefix>TEMPERATURE`, `<prefix>MAX_TOKENS`, `<prefix>TIMEOUT_MS`.
pub(crate) fn options_from_env(prefix: &str, base: LlmOptions) -> LlmOptions {
    LlmOptions {
        temperature: env_parse(&format!("{prefix}TEMPERATURE")).or(base.temperature),
        max_tokens: env_parse(&format!("{prefix}MAX_TOKENS")).or(base.max_tokens),
        timeout_ms: env_parse(&format!("{prefix}TIMEOUT_MS")).unwrap_or(base.timeout_ms),
    }
}

struct LineState<S> {
    bytes: S,
    buf: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

fn take_line(buf: &mut Vec<u8>, end: usize) -> String {
    let raw: Vec<u8> = buf.drain(..end).collect();
    String::from_utf8_lossy(&raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Splits a chunked byte stream into text lines, whatever the chunk boundaries.
///
/// A transport error ends the stream after being yielded once.
pub(crate) fn lines<S, B, E>(bytes: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = LineState {
        bytes,
        buf: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };
    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.pending.pop_front() {
                return Some((Ok(line), st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    st.buf.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                        let line = take_line(&mut st.buf, pos + 1);
                        st.pending.push_back(line);
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(Error::Llm(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    if !st.buf.is_empty() {
                        let end = st.buf.len();
                        let line = take_line(&mut st.buf, end);
                        st.pending.push_back(line);
                    }
                }
            }
        }
    })
    .boxed()
}
