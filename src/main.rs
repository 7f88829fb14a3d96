//! tabagg - grouped aggregation over CSV tables
//!
//! A CLI tool that loads a CSV table, filters, sorts and groups its rows,
//! and writes per-group summaries as a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad arguments, unreadable table, unknown column, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod table;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use models::{Extremes, GroupRow, GroupSummary, Grouping, Reducer, Report, ReportMetadata};
use report::chart::{self, ChartData};
use std::path::Path;
use std::time::Instant;
use table::reader::{self, ReadOptions};
use table::{writer, RecordSet};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("tabagg v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .tabagg.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", path.display());
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to customize delimiter, bucket ranges, and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete load -> select -> aggregate -> report pipeline.
fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(input) = args.input.clone() else {
        bail!("--input is required");
    };

    // Step 1: Load the table
    let options = ReadOptions::try_from(&config.source)?;
    let table = reader::read_table(&input, &options)?;
    info!(
        "Loaded {} rows with {} columns from {}",
        table.len(),
        table.columns().len(),
        input.display()
    );

    if args.dry_run {
        return handle_dry_run(&table);
    }

    // Step 2: Select rows
    let selected = select_rows(&table, &args)?;

    // Step 3: Summaries over the selection
    let extremes = match args.field {
        Some(ref field) if !selected.is_empty() => Some(compute_extremes(&selected, field)?),
        Some(ref field) => {
            warn!("No rows selected; skipping extremes for '{}'", field);
            None
        }
        None => None,
    };

    let grouped = group_rows(&selected, &args, &config)?;
    let groups = match grouped {
        Some((ref grouping, ref grouped_by, bucketed)) => Some(summarize_groups(
            grouping,
            grouped_by,
            bucketed,
            args.field.as_deref(),
            args.reducer,
        )?),
        None => None,
    };

    let charts = match grouped {
        Some((ref grouping, _, _)) if config.report.include_charts => Some(build_charts(
            grouping,
            &selected,
            args.field.as_deref(),
            &config.report.chart_columns,
        )?),
        Some(_) => None,
        None => {
            if config.report.include_charts {
                warn!("Chart data needs --group-by or --bucket; skipping charts");
            }
            None
        }
    };

    // Step 4: Project for output
    let output_rows = match args.columns {
        Some(ref columns) => analysis::project(&selected, columns)?,
        None => selected.clone(),
    };

    // Step 5: Build and save the report
    let metadata = ReportMetadata {
        source: input.display().to_string(),
        generated_at: Utc::now(),
        rows_loaded: table.len(),
        rows_selected: selected.len(),
        columns: output_rows.columns().to_vec(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let report = Report {
        metadata,
        preview: output_rows
            .iter()
            .take(config.report.preview_rows)
            .cloned()
            .collect(),
        extremes,
        groups,
        charts,
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if let Some(ref csv_path) = args.write_csv {
        writer::write_table(&output_rows, csv_path)?;
        println!("💾 Wrote {} rows to {}", output_rows.len(), csv_path.display());
    }

    print_summary(&report);
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(())
}

/// Handle --dry-run: print the loaded schema and exit.
fn handle_dry_run(table: &RecordSet) -> Result<()> {
    println!("\n🔍 Dry run: table loaded, nothing aggregated.\n");
    println!("   Rows: {}", table.len());
    println!("   Columns:");

    let numeric = analysis::numeric_columns(table);
    for column in table.columns() {
        if numeric.contains(column) {
            let mean = analysis::summarize(table, column, Reducer::Average)?;
            println!("     - {} (number, mean {:.3})", column, mean);
        } else {
            let mut values = analysis::column(table, column)?;
            values.sort();
            values.dedup();
            println!("     - {} (text, {} distinct)", column, values.len());
        }
    }

    println!("\n✅ Dry run complete. No report was written.");
    Ok(())
}

/// Apply --where, --reject and --sort-by in that order.
fn select_rows(table: &RecordSet, args: &Args) -> Result<RecordSet> {
    let mut rows = table.clone();

    for condition in &args.conditions {
        rows = analysis::filter(&rows, |r| condition.matches(r))?;
        debug!("--where {} kept {} rows", condition, rows.len());
    }

    for condition in &args.reject {
        rows = analysis::reject(&rows, |r| condition.matches(r))?;
        debug!("--reject {} kept {} rows", condition, rows.len());
    }

    if let Some(ref column) = args.sort_by {
        rows.require_column(column)?;
        rows = analysis::sort_by(&rows, analysis::by_column(column), args.descending)?;
    }

    Ok(rows)
}

/// Rows holding the minimum and maximum of the numeric `field`.
fn compute_extremes(rows: &RecordSet, field: &str) -> Result<Extremes> {
    rows.require_column(field)?;

    // Text cells fail with NonNumeric instead of ranking after every number.
    let numeric = |r: &table::Record| r.number(field).map(table::Value::Number);
    let min = analysis::min_by(rows, numeric)?.clone();
    let max = analysis::max_by(rows, numeric)?.clone();

    Ok(Extremes {
        field: field.to_string(),
        min,
        max,
    })
}

/// Group by column or by bucket, returning the grouping and what it was keyed on.
fn group_rows(
    rows: &RecordSet,
    args: &Args,
    config: &Config,
) -> Result<Option<(Grouping, String, bool)>> {
    if let Some(ref column) = args.group_by {
        rows.require_column(column)?;
        let grouping = analysis::group_by(rows, analysis::key_of(column))?;
        info!("Grouped by '{}' into {} groups", column, grouping.len());
        return Ok(Some((grouping, column.clone(), false)));
    }

    if args.bucket {
        let field = &config.buckets.field;
        let grouping = analysis::bucket(rows, field, &config.buckets.ranges)?;
        info!("Bucketed '{}' into {} groups", field, grouping.len());

        if let Some(unclassified) = grouping.unclassified() {
            warn!(
                "{} rows matched no bucket range for '{}'",
                unclassified.len(),
                field
            );
        }
        return Ok(Some((grouping, field.clone(), true)));
    }

    Ok(None)
}

/// Reduce every group. Without --field only row counts are meaningful.
fn summarize_groups(
    grouping: &Grouping,
    grouped_by: &str,
    bucketed: bool,
    field: Option<&str>,
    reducer: Reducer,
) -> Result<GroupSummary> {
    let (field, reducer) = match field {
        Some(field) => (field, reducer),
        None => {
            if reducer != Reducer::Count {
                info!("No --field given; counting rows per group");
            }
            (grouped_by, Reducer::Count)
        }
    };

    let values = analysis::aggregate(grouping, field, reducer)?;
    let rows = grouping
        .iter()
        .map(|(key, group)| GroupRow {
            key: key.clone(),
            count: group.len(),
            value: values[key],
        })
        .collect();

    Ok(GroupSummary {
        grouped_by: grouped_by.to_string(),
        bucketed,
        field: field.to_string(),
        reducer,
        rows,
        unclassified: grouping.unclassified().map_or(0, RecordSet::len),
    })
}

/// Bar, pie and spider data for a grouping.
fn build_charts(
    grouping: &Grouping,
    rows: &RecordSet,
    field: Option<&str>,
    chart_columns: &[String],
) -> Result<ChartData> {
    let columns = if chart_columns.is_empty() {
        analysis::numeric_columns(rows)
    } else {
        chart_columns.to_vec()
    };

    let bar_field = field
        .map(String::from)
        .or_else(|| columns.first().cloned());

    let bar = match bar_field {
        Some(ref field) => chart::bar_series(grouping, field)?,
        None => Vec::new(),
    };

    Ok(ChartData {
        bar_field,
        bar,
        pie: chart::pie_slices(grouping),
        spider: chart::spider_series(grouping, &columns)?,
    })
}

/// Print a short summary to stdout.
fn print_summary(report: &Report) {
    println!("\n📊 Summary:");
    println!(
        "   Rows: {} loaded, {} selected",
        report.metadata.rows_loaded, report.metadata.rows_selected
    );

    if let Some(ref extremes) = report.extremes {
        let value = |r: &table::Record| {
            r.get(&extremes.field)
                .map(|v| v.to_string())
                .unwrap_or_default()
        };
        println!(
            "   {}: min {} | max {}",
            extremes.field,
            value(&extremes.min),
            value(&extremes.max)
        );
    }

    if let Some(ref groups) = report.groups {
        println!(
            "   {} of {} by {}:",
            groups.reducer, groups.field, groups.grouped_by
        );
        for row in &groups.rows {
            println!("     - {}: {} ({} rows)", row.key, row.value, row.count);
        }
    }

    println!("   Duration: {:.3}s", report.metadata.duration_seconds);
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
