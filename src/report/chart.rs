//! Chart-ready series.
//!
//! Nothing here draws. These functions turn a [`Grouping`] into the
//! label/value pairs a charting library consumes: bar series of
//! min/average/max, pie slices of group counts, and per-group spider
//! profiles of column averages.

use crate::analysis::aggregate;
use crate::error::AggregateResult;
use crate::models::{Grouping, Reducer};
use serde::Serialize;

/// One labelled sequence of values, e.g. one bar cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// One pie slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub count: usize,
}

/// One spider axis value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiderPoint {
    pub property: String,
    pub value: f64,
}

/// One spider chart per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiderChart {
    pub label: String,
    pub points: Vec<SpiderPoint>,
}

/// Everything the report hands to a renderer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartData {
    /// Field the bar series summarize, if any numeric field was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_field: Option<String>,
    pub bar: Vec<Series>,
    pub pie: Vec<Slice>,
    pub spider: Vec<SpiderChart>,
}

/// `[min, average, max]` of `field` per group.
pub fn bar_series(grouping: &Grouping, field: &str) -> AggregateResult<Vec<Series>> {
    let mins = aggregate(grouping, field, Reducer::Min)?;
    let averages = aggregate(grouping, field, Reducer::Average)?;
    let maxes = aggregate(grouping, field, Reducer::Max)?;

    Ok(grouping
        .keys()
        .map(|key| Series {
            label: key.to_string(),
            values: vec![mins[key], averages[key], maxes[key]],
        })
        .collect())
}

/// Record count per group.
pub fn pie_slices(grouping: &Grouping) -> Vec<Slice> {
    grouping
        .iter()
        .map(|(key, group)| Slice {
            label: key.to_string(),
            count: group.len(),
        })
        .collect()
}

/// Per group, the average of each column scaled by 100.
pub fn spider_series(grouping: &Grouping, columns: &[String]) -> AggregateResult<Vec<SpiderChart>> {
    let averages = columns
        .iter()
        .map(|column| Ok((column, aggregate(grouping, column, Reducer::Average)?)))
        .collect::<AggregateResult<Vec<_>>>()?;

    Ok(grouping
        .keys()
        .map(|key| SpiderChart {
            label: key.to_string(),
            points: averages
                .iter()
                .map(|(column, per_group)| SpiderPoint {
                    property: column.to_string(),
                    value: per_group[key] * 100.0,
                })
                .collect(),
        })
        .collect())
}
