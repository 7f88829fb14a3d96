//! In-memory table model.
//!
//! A [`RecordSet`] is an ordered list of [`Record`]s that all share the
//! same column membership. Tables are loaded once by [`reader`] and written
//! back out by [`writer`]; everything in between produces new values.

pub mod reader;
pub mod writer;

use crate::error::{AggregateError, AggregateResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A typed cell value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric cell, parsed once at load time.
    Number(f64),
    /// Anything that did not look like a number.
    Text(String),
}

impl Value {
    /// Parse a literal the way the loader does: numeric if it contains a
    /// digit and parses as a float, text otherwise.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(number) = trimmed.parse::<f64>() {
                return Value::Number(number);
            }
        }
        Value::Text(raw.to_string())
    }

    /// Returns the numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// True when both values are of the same kind (number or text).
    pub fn same_kind(&self, other: &Value) -> bool {
        matches!(
            (self, other),
            (Value::Number(_), Value::Number(_)) | (Value::Text(_), Value::Text(_))
        )
    }

    // Folds -0.0 into 0.0 and every NaN into one NaN so Eq, Ord and Hash agree.
    fn canonical(n: f64) -> f64 {
        if n == 0.0 {
            0.0
        } else if n.is_nan() {
            f64::NAN
        } else {
            n
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                Value::canonical(*a).total_cmp(&Value::canonical(*b))
            }
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Number(n) => {
                0u8.hash(state);
                Value::canonical(*n).to_bits().hash(state);
            }
            Value::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One row of named, typed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used while loading rows.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Looks up a field, failing if the column is absent.
    pub fn get(&self, column: &str) -> AggregateResult<&Value> {
        self.fields
            .get(column)
            .ok_or_else(|| AggregateError::UnknownColumn(column.to_string()))
    }

    /// Looks up a numeric field. Text is never coerced.
    pub fn number(&self, column: &str) -> AggregateResult<f64> {
        match self.get(column)? {
            Value::Number(n) => Ok(*n),
            Value::Text(s) => Err(AggregateError::NonNumeric {
                column: column.to_string(),
                value: s.clone(),
            }),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Copies out the given columns, in the given order.
    fn select(&self, columns: &[String]) -> AggregateResult<Record> {
        columns.iter().try_fold(Record::new(), |record, column| {
            Ok(record.with(column.clone(), self.get(column)?.clone()))
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Record::new(), |record, (k, v)| record.with(k, v))
    }
}

/// An ordered table of records sharing one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    /// Builds a record set, checking every record against `columns`.
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> AggregateResult<Self> {
        for (row, record) in records.iter().enumerate() {
            if record.len() != columns.len() {
                return Err(AggregateError::SchemaMismatch {
                    row,
                    reason: format!(
                        "expected {} fields, found {}",
                        columns.len(),
                        record.len()
                    ),
                });
            }
            if let Some(missing) = columns.iter().find(|c| !record.contains(c)) {
                return Err(AggregateError::SchemaMismatch {
                    row,
                    reason: format!("missing column '{}'", missing),
                });
            }
        }

        Ok(Self { columns, records })
    }

    /// Builds a record set whose schema is taken from the first record.
    pub fn from_records(records: Vec<Record>) -> AggregateResult<Self> {
        let columns = records
            .first()
            .map(|r| r.columns().map(String::from).collect())
            .unwrap_or_default();
        Self::new(columns, records)
    }

    /// An empty record set with a known schema.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    /// A record set over the same schema. Callers only pass records taken
    /// from a set with this schema.
    pub(crate) fn derive(&self, records: Vec<Record>) -> Self {
        Self::from_parts(self.columns.clone(), records)
    }

    pub(crate) fn from_parts(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row access by position.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fails with `UnknownColumn` if `column` is not in the schema.
    pub fn require_column(&self, column: &str) -> AggregateResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(AggregateError::UnknownColumn(column.to_string()))
        }
    }

    /// Projects every record onto `columns` (already validated).
    pub(crate) fn select(&self, columns: Vec<String>) -> AggregateResult<Self> {
        let records = self
            .records
            .iter()
            .map(|r| r.select(&columns))
            .collect::<AggregateResult<Vec<_>>>()?;
        Ok(Self { columns, records })
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iris(length: f64, variety: &str) -> Record {
        Record::new()
            .with("sepallength", length)
            .with("variety", variety)
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(Value::parse_literal("5.1"), Value::Number(5.1));
        assert_eq!(Value::parse_literal(" 7 "), Value::Number(7.0));
        assert_eq!(Value::parse_literal("Setosa"), Value::from("Setosa"));
        // Float-like words without digits stay text.
        assert_eq!(Value::parse_literal("inf"), Value::from("inf"));
        assert_eq!(Value::parse_literal("NaN"), Value::from("NaN"));
        assert_eq!(Value::parse_literal("1.2.3"), Value::from("1.2.3"));
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Number(4.3) < Value::Number(7.0));
        assert!(Value::Number(1e9) < Value::from("a"));
        assert!(Value::from("Setosa") < Value::from("Virginica"));
        assert_eq!(Value::Number(0.0), Value::Number(-0.0));
        assert_eq!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(5.1).to_string(), "5.1");
        assert_eq!(Value::from("Setosa").to_string(), "Setosa");
    }

    #[test]
    fn test_record_lookup() {
        let record = iris(5.1, "Setosa");
        assert_eq!(record.number("sepallength"), Ok(5.1));
        assert_eq!(record.get("variety"), Ok(&Value::from("Setosa")));
        assert_eq!(
            record.get("petalwidth"),
            Err(AggregateError::UnknownColumn("petalwidth".to_string()))
        );
        assert!(matches!(
            record.number("variety"),
            Err(AggregateError::NonNumeric { .. })
        ));
    }

    #[test]
    fn test_record_set_schema_check() {
        let columns = vec!["sepallength".to_string(), "variety".to_string()];
        let ok = RecordSet::new(
            columns.clone(),
            vec![iris(5.1, "Setosa"), iris(7.0, "Versicolor")],
        );
        assert_eq!(ok.map(|rs| rs.len()), Ok(2));

        let short = Record::new().with("sepallength", 4.9);
        let err = RecordSet::new(columns.clone(), vec![iris(5.1, "Setosa"), short]);
        assert!(matches!(
            err,
            Err(AggregateError::SchemaMismatch { row: 1, .. })
        ));

        let renamed = Record::new()
            .with("sepallength", 4.9)
            .with("species", "Setosa");
        let err = RecordSet::new(columns, vec![renamed]);
        assert!(matches!(
            err,
            Err(AggregateError::SchemaMismatch { row: 0, .. })
        ));
    }

    #[test]
    fn test_from_records_infers_schema() {
        let rs = RecordSet::from_records(vec![iris(5.1, "Setosa")]).unwrap();
        assert_eq!(rs.columns(), ["sepallength", "variety"]);
        assert_eq!(rs.get(0).map(|r| r.number("sepallength")), Some(Ok(5.1)));
        assert!(rs.get(1).is_none());

        let empty = RecordSet::from_records(Vec::new()).unwrap();
        assert!(empty.is_empty());
        assert!(empty.columns().is_empty());
    }
}
