//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::Condition;
use crate::models::Reducer;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// tabagg - grouped aggregation over CSV tables
///
/// Load a CSV table, filter and sort its rows, group them by a column or
/// by numeric buckets, and report per-group sums, counts or averages.
///
/// Examples:
///   tabagg --input iris.csv --group-by variety --field sepallength
///   tabagg --input iris.csv --bucket --reducer count --charts
///   tabagg --input iris.csv --where "variety=Setosa" --sort-by sepallength --descending
///   tabagg --input iris.csv --columns variety,sepallength --write-csv result.csv
///   tabagg --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV file to load (must have a header row)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the config file's value, or tabagg_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tabagg.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "TABAGG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Field delimiter of the input file
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Round numeric cells to the nearest integer while loading
    #[arg(long)]
    pub round: bool,

    /// Keep only rows matching a condition (repeatable)
    ///
    /// Example: --where "variety=Setosa" --where "sepallength>=5"
    #[arg(long = "where", value_name = "COND")]
    pub conditions: Vec<Condition>,

    /// Drop rows matching a condition (repeatable)
    #[arg(long, value_name = "COND")]
    pub reject: Vec<Condition>,

    /// Sort rows by a column
    #[arg(long, value_name = "COLUMN")]
    pub sort_by: Option<String>,

    /// Sort in descending order
    #[arg(long, requires = "sort_by")]
    pub descending: bool,

    /// Columns kept in the preview and written CSV (comma-separated)
    ///
    /// Example: --columns variety,sepallength
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Group rows by the value of a column
    #[arg(short, long, value_name = "COLUMN", conflicts_with = "bucket")]
    pub group_by: Option<String>,

    /// Group rows by the bucket ranges from the config file
    #[arg(long)]
    pub bucket: bool,

    /// Numeric field to bucket on, overriding the config file
    #[arg(long, value_name = "COLUMN", requires = "bucket")]
    pub bucket_field: Option<String>,

    /// Field to aggregate and to report extremes for
    #[arg(short, long, value_name = "COLUMN")]
    pub field: Option<String>,

    /// Reducer applied per group
    #[arg(long, default_value = "average", value_name = "REDUCER")]
    pub reducer: Reducer,

    /// Include bar, pie and spider chart data in the report
    #[arg(long)]
    pub charts: bool,

    /// Number of rows shown in the report preview
    #[arg(long, value_name = "ROWS")]
    pub preview_rows: Option<usize>,

    /// Also write the selected rows to this CSV file
    #[arg(long, value_name = "FILE")]
    pub write_csv: Option<PathBuf>,

    /// Dry run: load the table and print its schema without reporting
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tabagg.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate input file if provided
        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref columns) = self.columns {
            if columns.iter().any(|c| c.trim().is_empty()) {
                return Err("--columns contains an empty column name".to_string());
            }
        }

        if self.preview_rows == Some(0) {
            return Err("Preview rows must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
