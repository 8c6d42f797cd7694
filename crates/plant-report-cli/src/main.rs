//! Plant Report CLI - identify a plant from a photo on the command line.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use plant_report_core::{
    AnalyzerProvider, AppConfig, PlantReporter, ReportContent, ReportRenderer, util,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "plant-report")]
#[command(author, version, about = "Identify a plant from a photo", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    input: PathBuf,

    /// Also write a PDF report to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print `{"result", "image"}` as JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Analyzer backend (gemini or openai)
    #[arg(long, env = "ANALYZER_PROVIDER")]
    provider: Option<AnalyzerProvider>,

    /// Analyzer API base URL
    #[arg(long, env = "ANALYZER_API_BASE")]
    api_base: Option<String>,

    /// Analyzer API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Let flags and environment override the loaded config.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(provider) = self.provider {
            config.analyzer.set_provider(provider);
        }
        if self.api_base.is_some() {
            config.analyzer.api_base.clone_from(&self.api_base);
        }
        if self.api_key.is_some() {
            config.analyzer.api_key.clone_from(&self.api_key);
        }
        if let Some(model) = &self.model {
            config.analyzer.model.clone_from(model);
        }
        if self.timeout.is_some() {
            config.analyzer.timeout_secs = self.timeout;
        }
    }
}

fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map_or_else(|| "application/octet-stream".to_string(), |m| m.essence_str().to_string())
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    info!("Loading image: {}", args.input.display());
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read image: {}", args.input.display()))?;
    let mime_type = mime_for(&args.input);

    let reporter = PlantReporter::new(&config).context("Failed to initialize analyzer")?;
    if reporter.analyzer().missing_api_key() {
        anyhow::bail!(
            "{} analyzer needs an API key (set GEMINI_API_KEY or pass --api-key)",
            reporter.analyzer().name()
        );
    }

    let pb = spinner(format!("Asking {} about the plant...", reporter.analyzer().name()));
    let analysis = reporter.analyze(&bytes, &mime_type).await;
    pb.finish_and_clear();
    let analysis = analysis.context("Analysis failed")?;

    // CLI output is intentional; the answer goes out before any report is rendered
    #[allow(clippy::print_stdout)]
    {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        } else {
            println!("{}", analysis.result);
        }
    }

    if let Some(output_path) = &args.output {
        let content = ReportContent {
            title: config.report.title.clone(),
            date: util::format_today(&config.report.date_format)?,
            body: analysis.result,
            image: Some(bytes),
        };
        let pdf = ReportRenderer::new(config.report.clone())
            .render(&content)
            .context("Failed to render PDF report")?;

        tokio::fs::write(output_path, pdf)
            .await
            .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
        info!("Report saved to {}", output_path.display());

        #[allow(clippy::print_stdout)]
        {
            println!("\nPDF report saved to: {}", output_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use plant_report_core::DEFAULT_OPENAI_MODEL;

    #[test]
    fn test_mime_for_known_and_unknown_extensions() {
        assert_eq!(mime_for(Path::new("monstera.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("leaf.png")), "image/png");
        assert_eq!(mime_for(Path::new("photo")), "application/octet-stream");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "plant-report",
            "fern.jpg",
            "--output",
            "fern.pdf",
            "--json",
            "--provider",
            "openai",
        ])
        .unwrap();

        assert_eq!(args.input, PathBuf::from("fern.jpg"));
        assert_eq!(args.output, Some(PathBuf::from("fern.pdf")));
        assert!(args.json);
        assert_eq!(args.provider, Some(AnalyzerProvider::OpenAi));
    }

    #[test]
    fn test_provider_flag_picks_that_providers_model() {
        let args = Args::try_parse_from(["plant-report", "fern.jpg", "--provider", "openai"]).unwrap();
        let mut config = AppConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.analyzer.provider, AnalyzerProvider::OpenAi);
        assert_eq!(config.analyzer.model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_model_flag_wins_over_provider_default() {
        let args = Args::try_parse_from([
            "plant-report",
            "fern.jpg",
            "--provider",
            "openai",
            "--model",
            "llava",
            "--timeout",
            "30",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.analyzer.model, "llava");
        assert_eq!(config.analyzer.timeout_secs, Some(30));
    }
}
