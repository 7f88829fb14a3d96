//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tabagg.toml` files.

use crate::cli::OutputFormat;
use crate::models::BucketRange;
use crate::table::reader::NumericConverter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".tabagg.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Table loading settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Bucket ranges for `--bucket`.
    #[serde(default)]
    pub buckets: BucketConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "tabagg_report.md".to_string()
}

/// Table loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Converter for numeric cells.
    #[serde(default)]
    pub numeric: NumericConverter,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            numeric: NumericConverter::default(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

/// Bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Numeric field to bucket on.
    #[serde(default = "default_bucket_field")]
    pub field: String,

    /// Ranges, tried in order.
    #[serde(default = "default_ranges")]
    pub ranges: Vec<BucketRange>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            field: default_bucket_field(),
            ranges: default_ranges(),
        }
    }
}

fn default_bucket_field() -> String {
    "sepallength".to_string()
}

fn default_ranges() -> Vec<BucketRange> {
    vec![
        BucketRange::new(0.0, 4.0, "short"),
        BucketRange::new(4.0, 6.0, "medium"),
        BucketRange::new(6.0, 8.0, "tall"),
    ]
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Include chart data when a grouping is computed.
    #[serde(default)]
    pub include_charts: bool,

    /// Columns for spider charts. Empty means every numeric column.
    #[serde(default)]
    pub chart_columns: Vec<String>,

    /// Number of rows shown in the preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_charts: false,
            chart_columns: Vec::new(),
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_preview_rows() -> usize {
    5
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// where the CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(delimiter) = args.delimiter {
            self.source.delimiter = delimiter;
        }
        if let Some(ref field) = args.bucket_field {
            self.buckets.field = field.clone();
        }
        if let Some(rows) = args.preview_rows {
            self.report.preview_rows = rows;
        }

        // Flags only ever switch things on.
        if args.round {
            self.source.numeric = NumericConverter::Round;
        }
        if args.charts {
            self.report.include_charts = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
