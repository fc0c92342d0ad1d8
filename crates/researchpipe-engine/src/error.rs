use researchpipe_core::Error;

/// Errors that abort a research session.
///
/// Per-source extraction and analysis failures, and synthesis failures, never surface here:
/// they degrade into dropped sources, sentinel scores, or the fallback summary.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("search phase failed: {0}")]
    SearchPhase(#[source] Error),
    #[error("search returned no usable sources for {0:?}")]
    NoSources(String),
    #[error("query must be a non-empty string")]
    EmptyQuery,
    #[error("invalid research config: {0}")]
    Config(String),
}
