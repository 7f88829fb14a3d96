//! Markdown and JSON report generation.
//!
//! This module renders an aggregation [`Report`] as a Markdown document or
//! as pretty-printed JSON.

use super::chart::ChartData;
use crate::models::{Extremes, GroupSummary, Report, ReportMetadata};
use crate::table::Record;
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# tabagg Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_preview_section(
        &report.metadata.columns,
        &report.preview,
    ));

    if let Some(ref extremes) = report.extremes {
        output.push_str(&generate_extremes_section(extremes));
    }

    if let Some(ref groups) = report.groups {
        output.push_str(&generate_groups_section(groups));
    }

    if let Some(ref charts) = report.charts {
        output.push_str(&generate_charts_section(charts));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows Loaded:** {}\n", metadata.rows_loaded));
    if metadata.rows_selected != metadata.rows_loaded {
        section.push_str(&format!(
            "- **Rows Selected:** {}\n",
            metadata.rows_selected
        ));
    }
    section.push_str(&format!(
        "- **Columns:** {}\n",
        metadata.columns.join(", ")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.3}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Preview](#preview)\n");

    if report.extremes.is_some() {
        toc.push_str("- [Extremes](#extremes)\n");
    }
    if report.groups.is_some() {
        toc.push_str("- [Groups](#groups)\n");
    }
    if report.charts.is_some() {
        toc.push_str("- [Chart Data](#chart-data)\n");
    }

    toc.push('\n');

    toc
}

/// Render records as a Markdown table over `columns`.
fn records_table(columns: &[String], records: &[Record]) -> String {
    let mut table = String::new();

    table.push_str(&format!("| {} |\n", columns.join(" | ")));
    table.push_str(&format!("|{}\n", ":---|".repeat(columns.len())));

    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        table.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    table.push('\n');

    table
}

/// Generate the preview section.
fn generate_preview_section(columns: &[String], preview: &[Record]) -> String {
    let mut section = String::new();

    section.push_str("## Preview\n\n");

    if preview.is_empty() {
        section.push_str("No rows matched the selection.\n\n");
        return section;
    }

    section.push_str(&records_table(columns, preview));

    section
}

/// Generate the extremes section.
fn generate_extremes_section(extremes: &Extremes) -> String {
    let mut section = String::new();

    section.push_str("## Extremes\n\n");
    section.push_str(&format!(
        "Rows with the smallest and largest `{}`:\n\n",
        extremes.field
    ));

    let columns: Vec<String> = extremes.min.columns().map(String::from).collect();
    section.push_str(&records_table(
        &columns,
        &[extremes.min.clone(), extremes.max.clone()],
    ));

    section
}

/// Generate the groups section.
fn generate_groups_section(groups: &GroupSummary) -> String {
    let mut section = String::new();

    section.push_str("## Groups\n\n");
    let how = if groups.bucketed { "Bucketed" } else { "Grouped" };
    section.push_str(&format!(
        "*{} by `{}` | {} of `{}`*\n\n",
        how, groups.grouped_by, groups.reducer, groups.field
    ));

    section.push_str(&format!("| Group | Rows | {} |\n", groups.reducer));
    section.push_str("|:---|:---:|---:|\n");
    for row in &groups.rows {
        section.push_str(&format!("| {} | {} | {} |\n", row.key, row.count, row.value));
    }
    section.push('\n');

    if groups.unclassified > 0 {
        section.push_str(&format!(
            "> **Unclassified:** {} row(s) matched no bucket range and are listed under `error`.\n\n",
            groups.unclassified
        ));
    }

    section
}

/// Generate the chart data section.
fn generate_charts_section(charts: &ChartData) -> String {
    let mut section = String::new();

    section.push_str("## Chart Data\n\n");

    if let Some(ref field) = charts.bar_field {
        section.push_str(&format!("### Bar: `{}`\n\n", field));
        section.push_str("| Series | Min | Average | Max |\n");
        section.push_str("|:---|---:|---:|---:|\n");
        for series in &charts.bar {
            let values: Vec<String> = series.values.iter().map(|v| format!("{:.3}", v)).collect();
            section.push_str(&format!("| {} | {} |\n", series.label, values.join(" | ")));
        }
        section.push('\n');
    }

    section.push_str("### Pie: Row Count\n\n");
    section.push_str("| Slice | Count |\n");
    section.push_str("|:---|:---:|\n");
    for slice in &charts.pie {
        section.push_str(&format!("| {} | {} |\n", slice.label, slice.count));
    }
    section.push('\n');

    for chart in &charts.spider {
        section.push_str(&format!("### Spider: {} Properties\n\n", chart.label));
        section.push_str("| Property | Average x 100 |\n");
        section.push_str("|:---|---:|\n");
        for point in &chart.points {
            section.push_str(&format!("| {} | {:.1} |\n", point.property, point.value));
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by tabagg*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
