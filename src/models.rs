//! Data models for groupings, reducers and reports.
//!
//! The table types themselves live in [`crate::table`]; this module holds
//! what the aggregator derives from them.

use crate::error::{AggregateError, AggregateResult};
use crate::report::chart::ChartData;
use crate::table::{Record, RecordSet, Value};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Label shown for records that matched no bucket range.
pub const UNCLASSIFIED_LABEL: &str = "error";

/// Key identifying one group in a [`Grouping`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// A raw column value.
    Value(Value),
    /// A derived label, e.g. a bucket name.
    Label(String),
    /// Sentinel for records no bucket range matched.
    Unclassified,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Value(v) => write!(f, "{}", v),
            GroupKey::Label(s) => write!(f, "{}", s),
            GroupKey::Unclassified => write!(f, "{}", UNCLASSIFIED_LABEL),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Value> for GroupKey {
    fn from(value: Value) -> Self {
        GroupKey::Value(value)
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        GroupKey::Label(s.to_string())
    }
}

/// A partition of a record set, in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    columns: Vec<String>,
    groups: IndexMap<GroupKey, RecordSet>,
}

impl Grouping {
    /// An empty grouping over the given schema.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            groups: IndexMap::new(),
        }
    }

    /// Builds a grouping from explicit groups. Every group must share the
    /// first group's schema; empty groups are allowed.
    #[allow(dead_code)] // Library entry point, exercised by tests
    pub fn from_groups(
        groups: impl IntoIterator<Item = (GroupKey, RecordSet)>,
    ) -> AggregateResult<Self> {
        let mut grouping = Grouping::default();

        for (index, (key, group)) in groups.into_iter().enumerate() {
            if index == 0 {
                grouping.columns = group.columns().to_vec();
            } else if group.columns() != grouping.columns.as_slice() {
                return Err(AggregateError::SchemaMismatch {
                    row: index,
                    reason: format!("group '{}' has a different schema", key),
                });
            }
            grouping.groups.insert(key, group);
        }

        Ok(grouping)
    }

    /// Appends a record to the group for `key`, creating it on first sight.
    pub(crate) fn push(&mut self, key: GroupKey, record: Record) {
        let columns = &self.columns;
        self.groups
            .entry(key)
            .or_insert_with(|| RecordSet::empty(columns.clone()))
            .push(record);
    }

    pub fn get(&self, key: &GroupKey) -> Option<&RecordSet> {
        self.groups.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &RecordSet)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Records no bucket range matched, if any.
    pub fn unclassified(&self) -> Option<&RecordSet> {
        self.get(&GroupKey::Unclassified)
    }

    /// Concatenates all groups in group order.
    #[allow(dead_code)] // Library entry point, exercised by tests
    pub fn flatten(&self) -> RecordSet {
        let records = self
            .groups
            .values()
            .flat_map(|g| g.iter().cloned())
            .collect();
        RecordSet::from_parts(self.columns.clone(), records)
    }
}

/// A half-open numeric range `[lower, upper)` mapped to a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRange {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Exclusive upper bound.
    pub upper: f64,
    /// Group label for values in range.
    pub label: String,
}

impl BucketRange {
    pub fn new(lower: f64, upper: f64, label: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            label: label.into(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value < self.upper
    }

    /// Rejects NaN bounds and inverted ranges.
    pub fn validate(&self) -> AggregateResult<()> {
        let reason = if self.lower.is_nan() || self.upper.is_nan() {
            "bounds must be numbers"
        } else if self.lower > self.upper {
            "lower bound exceeds upper bound"
        } else {
            return Ok(());
        };

        Err(AggregateError::InvalidBucket {
            label: self.label.clone(),
            reason: reason.to_string(),
        })
    }
}

/// A named per-group reduction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Sum,
    Count,
    #[default]
    Average,
    Min,
    Max,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Sum => write!(f, "Sum"),
            Reducer::Count => write!(f, "Count"),
            Reducer::Average => write!(f, "Average"),
            Reducer::Min => write!(f, "Min"),
            Reducer::Max => write!(f, "Max"),
        }
    }
}

/// One aggregated group in a report.
#[derive(Debug, Clone, Serialize)]
pub struct GroupRow {
    /// Group key.
    pub key: GroupKey,
    /// Number of records in the group.
    pub count: usize,
    /// Reduced value of the aggregated field.
    pub value: f64,
}

/// Aggregation results for a grouping.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    /// Column (or bucket field) the records were grouped by.
    pub grouped_by: String,
    /// Whether keys are bucket labels rather than raw values.
    pub bucketed: bool,
    /// Field the reducer ran over.
    pub field: String,
    /// Reducer applied per group.
    pub reducer: Reducer,
    /// One row per group, in group order.
    pub rows: Vec<GroupRow>,
    /// Records routed to the unclassified bucket.
    pub unclassified: usize,
}

/// The records holding the smallest and largest value of a field.
#[derive(Debug, Clone, Serialize)]
pub struct Extremes {
    pub field: String,
    pub min: Record,
    pub max: Record,
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Path of the loaded table.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Rows in the source table.
    pub rows_loaded: usize,
    /// Rows left after filtering.
    pub rows_selected: usize,
    /// Columns of the selected rows.
    pub columns: Vec<String>,
    /// Pipeline duration in seconds.
    pub duration_seconds: f64,
}

/// The complete aggregation report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// First rows of the selection, after projection.
    pub preview: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extremes: Option<Extremes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<GroupSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<ChartData>,
}
