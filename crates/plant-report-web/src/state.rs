use anyhow::{Context, Result};
use plant_report_core::{AnalysisCache, AppConfig, PlantReporter};

/// Global application state
pub struct AppState {
    pub reporter: PlantReporter,
    /// Present only when analyses may be fetched back by id
    pub cache: Option<AnalysisCache>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let reporter = PlantReporter::new(config).context("Failed to create analyzer")?;
        Ok(Self::with_reporter(reporter, config))
    }

    pub fn with_reporter(reporter: PlantReporter, config: &AppConfig) -> Self {
        Self {
            reporter,
            cache: AnalysisCache::from_config(&config.cache),
        }
    }
}
