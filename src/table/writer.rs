//! CSV serializer for derived tables.

use super::RecordSet;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write a table to a CSV file, header row first.
pub fn write_table(table: &RecordSet, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    write_to(table, file).with_context(|| format!("Failed to write {}", path.display()))?;

    debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Write a table as CSV into any writer.
pub fn write_to<W: Write>(table: &RecordSet, output: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(table.columns())?;
    for record in table {
        writer.write_record(record.values().map(|v| v.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}
