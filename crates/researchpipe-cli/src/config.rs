//! Layered application configuration.
//!
//! Priority (highest to lowest):
//! 1. Command-line flags
//! 2. Environment variables (`RESEARCHPIPE_` prefix, `__` between sections)
//! 3. `researchpipe.toml` (the `--config` path, else the working directory)
//! 4. Built-in defaults

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use researchpipe_engine::{OutputLanguage, ResearchConfig};
use researchpipe_local::browser::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "RESEARCHPIPE_";
pub const DEFAULT_CONFIG_FILE: &str = "researchpipe.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenaiCompat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u64,
    pub timeout_ms: u64,
    pub enable_streaming: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "llama2".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 2048,
            timeout_ms: 120_000,
            enable_streaming: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Duckduckgo,
    Searxng,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: SearchEngine,
    pub results_limit: usize,
    pub searxng_endpoint: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: SearchEngine::Duckduckgo,
            results_limit: 10,
            searxng_endpoint: None,
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub timeout_ms: u64,
    pub max_bytes: usize,
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_bytes: 5_000_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub browser: BrowserConfig,
    pub research: ResearchConfig,
    pub logging: LoggingConfig,
}

/// Flag values that win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_sources: Option<usize>,
    pub language: Option<OutputLanguage>,
    pub no_images: bool,
    pub stream: bool,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(n) = self.max_sources {
            cfg.research.max_sources = n;
        }
        if let Some(lang) = self.language {
            cfg.research.output_language = lang;
        }
        if self.no_images {
            cfg.research.include_images = false;
        }
        if self.stream {
            cfg.llm.enable_streaming = true;
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then the environment.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        let file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if file.exists() {
            figment = figment.merge(Toml::file(&file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<Self> {
        if let Some(p) = config_path {
            if !p.exists() {
                anyhow::bail!("config file not found: {}", p.display());
            }
        }
        let mut cfg: AppConfig = Self::figment(config_path).extract()?;
        overrides.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.research.validate()?;
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!(
                "llm.temperature must be within 0.0..=2.0 (got {})",
                self.llm.temperature
            );
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be > 0");
        }
        if self.search.results_limit == 0 {
            anyhow::bail!("search.results_limit must be > 0");
        }
        if self.search.engine == SearchEngine::Searxng && self.search.searxng_endpoint.is_none() {
            anyhow::bail!("search.engine = \"searxng\" requires search.searxng_endpoint");
        }
        Ok(())
    }

    /// Copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        if out.llm.api_key.is_some() {
            out.llm.api_key = Some("***".to_string());
        }
        out
    }
}

/// Loads `RESEARCHPIPE_ENV_FILE` if set; variables already in the environment win.
pub fn load_env_file() -> anyhow::Result<Option<PathBuf>> {
    let Some(p) = std::env::var_os("RESEARCHPIPE_ENV_FILE") else {
        return Ok(None);
    };
    let path = PathBuf::from(p);
    if path.as_os_str().is_empty() {
        return Ok(None);
    }
    dotenvy::from_path(&path)
        .map_err(|e| anyhow::anyhow!("env file {}: {e}", path.display()))?;
    Ok(Some(path))
}
