//! Plant Report Web - identify plants from photos and export PDF reports.

mod helpers;
mod routes;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use plant_report_core::{AnalyzerProvider, AppConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Resolve the static files directory.
///
/// Priority:
/// 1. Explicit path if provided
/// 2. ./public if it exists
/// 3. The workspace's bundled public directory
fn resolve_static_dir(explicit_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit_path {
        return path;
    }

    let local_public = PathBuf::from("public");
    if local_public.is_dir() {
        return local_public;
    }

    // Fall back to compiled-in path (useful for cargo run)
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../public"))
}

#[derive(Parser, Debug)]
#[command(name = "plant-report-web")]
#[command(author, version, about = "Plant Report Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Analyzer backend (gemini or openai)
    #[arg(long, env = "ANALYZER_PROVIDER")]
    provider: Option<AnalyzerProvider>,

    /// Analyzer API base URL (defaults to the provider's public endpoint)
    #[arg(long, env = "ANALYZER_API_BASE")]
    api_base: Option<String>,

    /// Analyzer API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Config file (defaults to ~/.config/plant-report/config.toml or ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Static files directory (defaults to ./public)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Maximum upload size for /analyze, in MB
    #[arg(long, default_value = "25")]
    max_upload_mb: usize,

    /// Keep analyses in memory so /download can take an id
    #[arg(long)]
    cache: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Load the config file, then let flags and environment override it.
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AppConfig::load(),
        };

        if let Some(provider) = self.provider {
            config.analyzer.set_provider(provider);
        }
        if let Some(api_base) = &self.api_base {
            config.analyzer.api_base = Some(api_base.clone());
        }
        if let Some(api_key) = &self.api_key {
            config.analyzer.api_key = Some(api_key.clone());
        }
        if let Some(model) = &self.model {
            config.analyzer.model.clone_from(model);
        }
        if self.cache {
            config.cache.enabled = true;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = args.app_config()?;
    let state = Arc::new(
        AppState::new(&config).context("Failed to initialize application state")?,
    );

    let analyzer = state.reporter.analyzer();
    if analyzer.missing_api_key() {
        warn!(
            "{} analyzer has no API key; /analyze will fail until GEMINI_API_KEY is set",
            analyzer.name()
        );
    } else {
        info!("Using {} analyzer with model {}", analyzer.name(), config.analyzer.model);
    }
    if state.cache.is_some() {
        info!(
            "Analysis cache enabled ({} entries, {}s TTL)",
            config.cache.max_entries, config.cache.ttl_seconds
        );
    }

    let static_dir = resolve_static_dir(args.static_dir.clone());
    let app = routes::router(
        state,
        &static_dir,
        args.max_upload_mb.saturating_mul(1024 * 1024),
    );

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid host or port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server is live on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use plant_report_core::DEFAULT_OPENAI_MODEL;
    use tempfile::TempDir;

    fn args_with_config(extra: &[&str]) -> (TempDir, Args) {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[report]\ntitle = \"Garden Report\"\n").unwrap();

        let mut argv = vec![
            "plant-report-web".to_string(),
            "--config".to_string(),
            config_path.display().to_string(),
        ];
        argv.extend(extra.iter().map(ToString::to_string));
        (tmp, Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_provider_flag_picks_that_providers_model() {
        let (_tmp, args) = args_with_config(&["--provider", "openai", "--cache"]);
        let config = args.app_config().unwrap();

        assert_eq!(config.analyzer.provider, AnalyzerProvider::OpenAi);
        assert_eq!(config.analyzer.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.report.title, "Garden Report");
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_model_flag_wins_over_provider_default() {
        let (_tmp, args) = args_with_config(&["--provider", "openai", "--model", "llava"]);
        let config = args.app_config().unwrap();

        assert_eq!(config.analyzer.model, "llava");
    }
}
