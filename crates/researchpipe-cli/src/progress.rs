use futures::StreamExt;
use researchpipe_core::{Result, TextGenerator, TextStream};
use researchpipe_engine::{Phase, PhaseObserver};
use std::io::Write;
use std::sync::Arc;

/// Human progress lines on stderr.
pub struct StderrProgress;

impl PhaseObserver for StderrProgress {
    fn phase_started(&self, phase: Phase) {
        eprintln!("==> {}", phase.as_str());
    }

    fn source_started(&self, _phase: Phase, index: usize, total: usize, title: &str) {
        eprintln!("    [{}/{}] {}", index + 1, total, title);
    }

    fn phase_finished(&self, phase: Phase, items: usize) {
        eprintln!("    {} done ({items})", phase.as_str());
    }
}

/// Shows completions as they arrive.
///
/// Forwards every fragment of the inner generator's stream to stderr and hands the
/// concatenation back, so callers still see a plain `generate`.
pub struct StreamingEcho {
    inner: Arc<dyn TextGenerator>,
}

impl StreamingEcho {
    pub fn new(inner: Arc<dyn TextGenerator>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl TextGenerator for StreamingEcho {
    fn model(&self) -> &str {
        self.inner.model()
    }

    fn supports_streaming(&self) -> bool {
        self.inner.supports_streaming()
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        if !self.inner.supports_streaming() {
            return self.inner.generate(prompt, system).await;
        }
        let mut stream = self.inner.generate_stream(prompt, system).await?;
        let mut out = String::new();
        let mut stderr = std::io::stderr();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            let _ = stderr.write_all(fragment.as_bytes());
            let _ = stderr.flush();
            out.push_str(&fragment);
        }
        let _ = writeln!(stderr);
        Ok(out)
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        self.inner.generate_stream(prompt, system).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use researchpipe_core::Error;

    struct Chunky {
        streaming: bool,
    }

    #[async_trait::async_trait]
    impl TextGenerator for Chunky {
        fn model(&self) -> &str {
            "chunky"
        }

        fn supports_streaming(&self) -> bool {
            self.streaming
        }

        async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<String> {
            Ok("whole".to_string())
        }

        async fn generate_stream(&self, _prompt: &str, _system: Option<&str>) -> Result<TextStream> {
            let parts: Vec<Result<String>> = vec![Ok("a".into()), Ok("b".into()), Ok("c".into())];
            Ok(futures::stream::iter(parts).boxed())
        }
    }

    struct Broken;

    #[async_trait::async_trait]
    impl TextGenerator for Broken {
        fn model(&self) -> &str {
            "broken"
        }

        fn supports_streaming(&self) -> bool {
            true
        }

        async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<String> {
            Err(Error::Llm("unused".to_string()))
        }

        async fn generate_stream(&self, _prompt: &str, _system: Option<&str>) -> Result<TextStream> {
            let parts: Vec<Result<String>> =
                vec![Ok("a".into()), Err(Error::Llm("reset".to_string()))];
            Ok(futures::stream::iter(parts).boxed())
        }
    }

    #[tokio::test]
    async fn echo_returns_the_concatenated_stream() {
        let g = StreamingEcho::new(Arc::new(Chunky { streaming: true }));
        assert_eq!(g.model(), "chunky");
        assert_eq!(g.generate("p", None).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn echo_passes_through_non_streaming_backends() {
        let g = StreamingEcho::new(Arc::new(Chunky { streaming: false }));
        assert_eq!(g.generate("p", None).await.unwrap(), "whole");
    }

    #[tokio::test]
    async fn a_broken_stream_is_a_failed_completion() {
        let g = StreamingEcho::new(Arc::new(Broken));
        assert!(g.generate("p", None).await.is_err());
    }
}
