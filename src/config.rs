//! Pipeline configuration and artifact naming

use crate::error::{EdaError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Exclusive upper bound on nightly price, in currency units
pub const PRICE_CEILING: i64 = 1000;

/// Smallest type-inference window the loader accepts
pub const MIN_INFER_SCHEMA_LENGTH: usize = 1000;

const ARTIFACT_INFIX: &str = "airbnblistings";

/// Configuration for a single pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// URL or local path of the listings snapshot (CSV, optionally gzipped)
    pub source_url: String,

    /// Date the snapshot was scraped; prefixes every artifact name
    pub snapshot_date: NaiveDate,

    /// City label used in artifact names
    pub city_label: String,

    /// Rows priced at or above this are dropped
    pub price_ceiling: i64,

    /// Directory receiving every artifact
    pub output_dir: PathBuf,

    /// Rows inspected before the loader fixes column types
    pub infer_schema_length: usize,

    /// File name of the uncompressed raw copy; `None` skips writing it
    pub raw_copy_name: Option<String>,

    /// Timeout for fetching a remote source
    pub http_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: "https://data.insideairbnb.com/the-netherlands/north-holland/amsterdam/2023-09-03/data/listings.csv.gz".to_string(),
            snapshot_date: NaiveDate::from_ymd_opt(2023, 9, 3).unwrap_or_default(),
            city_label: "amsterdam".to_string(),
            price_ceiling: PRICE_CEILING,
            output_dir: PathBuf::from("data"),
            infer_schema_length: 10_000,
            raw_copy_name: Some("listings.csv".to_string()),
            http_timeout_secs: 300,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EdaError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the listings source (URL or local path)
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_url = source.into();
        self
    }

    /// Set the snapshot date used in artifact names
    pub fn with_snapshot_date(mut self, date: NaiveDate) -> Self {
        self.snapshot_date = date;
        self
    }

    /// Set the city label used in artifact names
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city_label = city.into();
        self
    }

    /// Set the exclusive price ceiling
    pub fn with_price_ceiling(mut self, ceiling: i64) -> Self {
        self.price_ceiling = ceiling;
        self
    }

    /// Set the artifact directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the type-inference window
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Skip writing the uncompressed raw copy
    pub fn without_raw_copy(mut self) -> Self {
        self.raw_copy_name = None;
        self
    }

    /// Check the configuration before any IO happens
    pub fn validate(&self) -> Result<()> {
        if self.source_url.trim().is_empty() {
            return Err(EdaError::ConfigError("source_url is empty".into()));
        }
        if self.price_ceiling <= 0 {
            return Err(EdaError::ConfigError(format!(
                "price_ceiling must be positive, got {}",
                self.price_ceiling
            )));
        }
        if self.infer_schema_length < MIN_INFER_SCHEMA_LENGTH {
            return Err(EdaError::ConfigError(format!(
                "infer_schema_length must be at least {}, got {}",
                MIN_INFER_SCHEMA_LENGTH, self.infer_schema_length
            )));
        }
        let city = self.city_label.trim();
        if city.is_empty() || city.contains(['/', '\\']) {
            return Err(EdaError::ConfigError(format!(
                "city_label {:?} is not usable in a file name",
                self.city_label
            )));
        }
        if let Some(name) = &self.raw_copy_name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(EdaError::ConfigError(format!(
                    "raw_copy_name {:?} must be a bare file name",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Paths of every artifact this run writes
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::for_config(self)
    }
}

/// Output locations derived from a [`PipelineConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub raw_copy: Option<PathBuf>,
    pub select_variables: PathBuf,
    pub analysis_dataset: PathBuf,
    pub report: PathBuf,
}

impl ArtifactPaths {
    pub fn for_config(config: &PipelineConfig) -> Self {
        let stem = format!(
            "{}-{}-{}",
            config.snapshot_date.format("%Y-%m-%d"),
            config.city_label.trim(),
            ARTIFACT_INFIX
        );
        let dir = &config.output_dir;

        Self {
            raw_copy: config.raw_copy_name.as_ref().map(|name| dir.join(name)),
            select_variables: dir.join(format!("{stem}-select_variables.parquet")),
            analysis_dataset: dir.join(format!("{stem}-analysis_dataset.parquet")),
            report: dir.join(format!("{stem}-pipeline_report.json")),
        }
    }
}
