use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Prompt sent alongside every uploaded image.
pub const DEFAULT_PROMPT: &str = "tell me about this plant in the image. tell me some interesting facts about this plant, where it is found, where it is used and some more information about this plant. also give me some care recommendations.";

/// Default Gemini model identifier
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default model for OpenAI-compatible endpoints
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Gemini REST endpoint (v1beta carries `inlineData` support for all models)
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// OpenAI REST endpoint, used when the provider is switched without a base
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Which wire protocol the analyzer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerProvider {
    /// Google Gemini `generateContent`
    #[default]
    Gemini,
    /// Any OpenAI-compatible `chat/completions` endpoint with vision support
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

impl AnalyzerProvider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// Endpoint used when none is configured explicitly.
    pub const fn default_api_base(self) -> &'static str {
        match self {
            Self::Gemini => GEMINI_API_BASE,
            Self::OpenAi => OPENAI_API_BASE,
        }
    }

    /// Model used when none is configured explicitly.
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_MODEL,
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }
}

impl std::fmt::Display for AnalyzerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyzerProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai-compatible" | "openai_compatible" => Ok(Self::OpenAi),
            other => Err(Error::ConfigInvalid {
                field: "analyzer.provider".to_string(),
                reason: format!("unknown provider '{other}' (expected 'gemini' or 'openai')"),
            }),
        }
    }
}

/// Analyzer backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub provider: AnalyzerProvider,
    /// Base URL; `None` means the provider's public endpoint
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Empty in a config file means the provider's default model
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Client-side request timeout. Unset means wait for the server.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl AnalyzerConfig {
    /// Create a new analyzer config for the given provider
    pub fn new(
        provider: AnalyzerProvider,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            api_base: None,
            api_key,
            model: model.into(),
            prompt: default_prompt(),
            timeout_secs: None,
        }
    }

    /// Switch provider, carrying the model along when it is still the
    /// previous provider's default.
    pub fn set_provider(&mut self, provider: AnalyzerProvider) {
        let model = self.model.trim();
        if model.is_empty() || model == self.provider.default_model() {
            self.model = provider.default_model().to_string();
        }
        self.provider = provider;
    }

    /// The endpoint requests go to, without a trailing slash.
    pub fn resolved_api_base(&self) -> String {
        self.api_base
            .as_deref()
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_api_base())
            .trim_end_matches('/')
            .to_string()
    }
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::new(AnalyzerProvider::Gemini, None, DEFAULT_MODEL)
    }
}

/// Where transient files live, relative to the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("upload")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

/// PDF report layout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f32,
    #[serde(default = "default_date_font_size")]
    pub date_font_size: f32,
    #[serde(default = "default_body_font_size")]
    pub body_font_size: f32,
    /// Side of the square box the image is scaled into (points)
    #[serde(default = "default_image_fit")]
    pub image_fit: f32,
    /// chrono format string for the date line
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_title() -> String {
    "Plant Analysis Report".to_string()
}

const fn default_title_font_size() -> f32 {
    24.0
}

const fn default_date_font_size() -> f32 {
    16.0
}

const fn default_body_font_size() -> f32 {
    13.0
}

const fn default_image_fit() -> f32 {
    500.0
}

fn default_date_format() -> String {
    "%-m/%-d/%Y".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            title_font_size: default_title_font_size(),
            date_font_size: default_date_font_size(),
            body_font_size: default_body_font_size(),
            image_fit: default_image_fit(),
            date_format: default_date_format(),
        }
    }
}

/// Server-side analysis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Keep analyses so `/download` can reference them by id
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of cached analyses
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Time to live in seconds (0 = no expiry)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

const fn default_max_entries() -> u64 {
    100
}

const fn default_ttl_seconds() -> u64 {
    15 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: default_max_entries(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Analyzer backend configuration
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Upload and report directories
    #[serde(default)]
    pub storage: StorageConfig,

    /// PDF layout
    #[serde(default)]
    pub report: ReportConfig,

    /// Analysis cache
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        if config.analyzer.model.trim().is_empty() {
            config.analyzer.model = config.analyzer.provider.default_model().to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject values the renderer cannot lay out.
    pub fn validate(&self) -> Result<(), Error> {
        let sizes = [
            ("report.title_font_size", self.report.title_font_size),
            ("report.date_font_size", self.report.date_font_size),
            ("report.body_font_size", self.report.body_font_size),
            ("report.image_fit", self.report.image_fit),
        ];
        for (field, value) in sizes {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }
        if !crate::util::is_valid_date_format(&self.report.date_format) {
            return Err(Error::ConfigInvalid {
                field: "report.date_format".to_string(),
                reason: format!("'{}' is not a valid strftime pattern", self.report.date_format),
            });
        }
        if self.analyzer.model.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "analyzer.model".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Load from default locations (~/.config/plant-report/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("plant-report").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }
}
