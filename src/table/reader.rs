//! CSV record source.
//!
//! Reads a delimited file with a header row into a [`RecordSet`]. Cells are
//! typed exactly once here, so nothing downstream re-parses strings.

use super::{Record, RecordSet, Value};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// How numeric-looking cells are converted at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NumericConverter {
    /// Parse numeric cells as floats.
    #[default]
    Parse,
    /// Parse numeric cells and round them to the nearest integer.
    Round,
}

/// Options for reading a table.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Cell converter.
    pub converter: NumericConverter,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            converter: NumericConverter::Parse,
        }
    }
}

impl TryFrom<&crate::config::SourceConfig> for ReadOptions {
    type Error = anyhow::Error;

    fn try_from(config: &crate::config::SourceConfig) -> Result<Self> {
        if !config.delimiter.is_ascii() {
            bail!(
                "Delimiter must be a single ASCII character, got '{}'",
                config.delimiter
            );
        }

        Ok(Self {
            delimiter: config.delimiter as u8,
            converter: config.numeric,
        })
    }
}

/// Read a table from a CSV file on disk.
pub fn read_table(path: &Path, options: &ReadOptions) -> Result<RecordSet> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open table: {}", path.display()))?;

    let table = read_from(file, options)
        .with_context(|| format!("Failed to load table: {}", path.display()))?;

    debug!(
        "Read {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );

    Ok(table)
}

/// Read a table from any reader producing CSV bytes.
pub fn read_from<R: Read>(input: R, options: &ReadOptions) -> Result<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(input);

    let columns: Vec<String> = reader
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(normalize_header)
        .collect();

    for (i, column) in columns.iter().enumerate() {
        if column.is_empty() {
            bail!("Header {} is empty after normalization", i + 1);
        }
        if columns[..i].contains(column) {
            bail!("Duplicate column '{}'", column);
        }
    }

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        // Data rows start on line 2.
        let fields = result.with_context(|| format!("Malformed row at line {}", row + 2))?;

        let record: Record = columns
            .iter()
            .zip(fields.iter())
            .map(|(column, cell)| (column.clone(), convert_cell(cell, options.converter)))
            .collect();
        records.push(record);
    }

    Ok(RecordSet::new(columns, records)?)
}

/// Normalize a header into a column identifier: lowercased, characters
/// other than word characters and whitespace dropped, then trimmed, with
/// each whitespace run folded to a single `_`.
pub fn normalize_header(raw: &str) -> String {
    let kept: String = raw
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .filter(|c| c.is_whitespace() || c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Convert one raw cell with the given converter.
pub fn convert_cell(raw: &str, converter: NumericConverter) -> Value {
    match (Value::parse_literal(raw), converter) {
        (Value::Number(n), NumericConverter::Round) => Value::Number(n.round()),
        (value, _) => value,
    }
}
