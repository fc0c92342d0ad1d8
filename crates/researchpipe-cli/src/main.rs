use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use researchpipe_core::{SearchProvider, TextGenerator};
use researchpipe_engine::{auto_filename, OutputLanguage, ResearchPipeline, SearchCollector};
use researchpipe_local::{
    http_client, BrowserOptions, ContentImageFilter, DuckDuckGoSearchProvider, HttpBrowser,
    LlmOptions, OllamaClient, OpenAiCompatClient, SearxngSearchProvider,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod logging;
mod progress;

use config::{AppConfig, LlmProvider, Overrides, SearchEngine};
use progress::{StderrProgress, StreamingEcho};

#[derive(Parser, Debug)]
#[command(name = "researchpipe")]
#[command(about = "Adaptive research synthesis: search, extract, analyze, report", long_about = None)]
struct Cli {
    /// Config file (default: ./researchpipe.toml when present).
    #[arg(long, global = true, env = "RESEARCHPIPE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level logs on stderr (unless RUST_LOG is set).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Research a question and print (or save) the report.
    Research(ResearchCmd),
    /// Run only the search phase and print the deduplicated results (json).
    Search(SearchCmd),
    /// Print the effective configuration (json; secrets masked).
    Config,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

#[derive(clap::Args, Debug)]
struct ResearchCmd {
    query: String,
    #[arg(long)]
    max_sources: Option<usize>,
    /// Output language: english|chinese
    #[arg(long)]
    language: Option<OutputLanguage>,
    /// Skip image collection.
    #[arg(long)]
    no_images: bool,
    /// Write the report to this path.
    #[arg(long, conflicts_with = "auto_save")]
    output: Option<PathBuf>,
    /// Write the report under a generated file name in the working directory.
    #[arg(long)]
    auto_save: bool,
    /// Echo model output to stderr as it streams.
    #[arg(long)]
    stream: bool,
    #[arg(long, value_enum, default_value = "markdown")]
    format: ReportFormat,
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    query: String,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn build_search(cfg: &AppConfig, client: reqwest::Client) -> Result<Arc<dyn SearchProvider>> {
    let limit = cfg.search.results_limit;
    Ok(match cfg.search.engine {
        SearchEngine::Duckduckgo => Arc::new(DuckDuckGoSearchProvider::new(client, limit)),
        SearchEngine::Searxng => {
            let endpoint = cfg
                .search
                .searxng_endpoint
                .clone()
                .context("search.searxng_endpoint is not set")?;
            Arc::new(SearxngSearchProvider::new(client, endpoint, limit))
        }
    })
}

fn build_llm(cfg: &AppConfig, client: reqwest::Client) -> Arc<dyn TextGenerator> {
    let llm = &cfg.llm;
    let options = LlmOptions {
        temperature: Some(llm.temperature),
        max_tokens: Some(llm.max_tokens),
        timeout_ms: llm.timeout_ms,
    };
    match llm.provider {
        LlmProvider::Ollama => Arc::new(OllamaClient::new(
            client,
            llm.base_url.clone(),
            llm.model.clone(),
            options,
        )),
        LlmProvider::OpenaiCompat => Arc::new(OpenAiCompatClient::new(
            client,
            llm.base_url.clone(),
            llm.api_key.clone(),
            llm.model.clone(),
            options,
        )),
    }
}

fn write_report(path: &Path, body: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

async fn research(cfg: AppConfig, args: ResearchCmd, verbose: bool) -> Result<()> {
    let client = http_client(&cfg.browser.user_agent)?;
    let search = build_search(&cfg, client.clone())?;
    let browser = Arc::new(HttpBrowser::with_client(
        client.clone(),
        BrowserOptions {
            timeout_ms: cfg.browser.timeout_ms,
            max_bytes: cfg.browser.max_bytes,
            user_agent: cfg.browser.user_agent.clone(),
            ..BrowserOptions::default()
        },
    ));
    let mut llm = build_llm(&cfg, client);
    let echo = args.stream || (cfg.llm.enable_streaming && verbose);
    if echo && llm.supports_streaming() {
        llm = Arc::new(StreamingEcho::new(llm));
    }

    let pipeline = ResearchPipeline::new(cfg.research.clone(), search, browser, llm.clone())?
        .with_search_timeout_ms(cfg.search.timeout_ms)
        .with_image_filter(Arc::new(ContentImageFilter::default()))
        .with_observer(Arc::new(StderrProgress));
    let session = pipeline.run(&args.query).await?;
    let report = pipeline.report(&session);

    let (body, ext) = match args.format {
        ReportFormat::Markdown => (report.markdown.clone(), "md"),
        ReportFormat::Json => (
            serde_json::to_string_pretty(&serde_json::json!({
                "report": report,
                "session": session,
            }))?,
            "json",
        ),
    };

    let target = match (args.output, args.auto_save) {
        (Some(p), _) => Some(p),
        (None, true) => {
            let name = auto_filename(
                &session.query,
                llm.model(),
                cfg.research.output_language,
                chrono::Utc::now(),
            );
            Some(PathBuf::from(name).with_extension(ext))
        }
        (None, false) => None,
    };
    match target {
        Some(path) => {
            write_report(&path, &body)?;
            tracing::info!(path = %path.display(), "report saved");
            eprintln!("report saved to {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

async fn search_only(cfg: AppConfig, args: SearchCmd) -> Result<()> {
    let client = http_client(&cfg.browser.user_agent)?;
    let provider = build_search(&cfg, client)?;
    let limit = args.limit.unwrap_or(cfg.search.results_limit);
    let results = SearchCollector::new(provider)
        .with_language_hint(cfg.research.output_language.file_suffix())
        .with_timeout_ms(cfg.search.timeout_ms)
        .collect(&args.query, limit)
        .await?;
    let out = serde_json::json!({
        "kind": "search",
        "query": args.query,
        "engine": cfg.search.engine,
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_env_file()?;

    let cli = Cli::parse();

    let overrides = match &cli.command {
        Commands::Research(args) => Overrides {
            max_sources: args.max_sources,
            language: args.language,
            no_images: args.no_images,
            stream: args.stream,
        },
        _ => Overrides::default(),
    };

    match cli.command {
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "researchpipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("researchpipe {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
        Commands::Config => {
            let cfg = AppConfig::load(cli.config.as_deref(), &overrides)?;
            println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
        }
        Commands::Search(args) => {
            let cfg = AppConfig::load(cli.config.as_deref(), &overrides)?;
            logging::init(&cfg.logging, cli.verbose);
            search_only(cfg, args).await?;
        }
        Commands::Research(args) => {
            let cfg = AppConfig::load(cli.config.as_deref(), &overrides)?;
            logging::init(&cfg.logging, cli.verbose);
            research(cfg, args, cli.verbose).await?;
        }
    }
    Ok(())
}
