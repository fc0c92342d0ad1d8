use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber on stderr so stdout stays clean for reports.
///
/// `RUST_LOG` wins; otherwise `--verbose` means `debug`, else the configured level.
pub fn init(cfg: &LoggingConfig, verbose: bool) {
    let default = if verbose { "debug" } else { cfg.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    // A second init (tests, embedding) is not an error worth failing on.
    let _ = if cfg.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
