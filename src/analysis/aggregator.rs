//! Grouped tabular aggregation.
//!
//! Every function here borrows its input and returns a fresh value; nothing
//! mutates a [`RecordSet`] or [`Grouping`] in place. Key and predicate
//! closures return `AggregateResult` so a missing column inside them stops
//! the operation instead of being papered over.

use crate::error::{AggregateError, AggregateResult};
use crate::models::{BucketRange, GroupKey, Grouping, Reducer};
use crate::table::{Record, RecordSet, Value};
use indexmap::IndexMap;
use std::cmp::Ordering;

/// Key function reading one column's value.
pub fn by_column(column: &str) -> impl Fn(&Record) -> AggregateResult<Value> + '_ {
    move |record| record.get(column).cloned()
}

/// Group key function reading one column's value.
pub fn key_of(column: &str) -> impl Fn(&Record) -> AggregateResult<GroupKey> + '_ {
    move |record| record.get(column).cloned().map(GroupKey::Value)
}

/// Keep only `columns`, in the order given. Repeated names are collapsed.
pub fn project<S: AsRef<str>>(records: &RecordSet, columns: &[S]) -> AggregateResult<RecordSet> {
    let mut selected: Vec<String> = Vec::with_capacity(columns.len());

    for column in columns.iter().map(AsRef::as_ref) {
        records.require_column(column)?;
        if !selected.iter().any(|c| c == column) {
            selected.push(column.to_string());
        }
    }

    records.select(selected)
}

/// Records for which `predicate` holds, in original order.
pub fn filter<P>(records: &RecordSet, predicate: P) -> AggregateResult<RecordSet>
where
    P: Fn(&Record) -> AggregateResult<bool>,
{
    retain(records, predicate, true)
}

/// Records for which `predicate` does not hold, in original order.
pub fn reject<P>(records: &RecordSet, predicate: P) -> AggregateResult<RecordSet>
where
    P: Fn(&Record) -> AggregateResult<bool>,
{
    retain(records, predicate, false)
}

fn retain<P>(records: &RecordSet, predicate: P, keep: bool) -> AggregateResult<RecordSet>
where
    P: Fn(&Record) -> AggregateResult<bool>,
{
    let mut kept = Vec::new();
    for record in records {
        if predicate(record)? == keep {
            kept.push(record.clone());
        }
    }
    Ok(records.derive(kept))
}

/// Stable sort by `key`. Equal keys keep their input order in both
/// directions.
pub fn sort_by<K, F>(records: &RecordSet, key: F, descending: bool) -> AggregateResult<RecordSet>
where
    K: Ord,
    F: Fn(&Record) -> AggregateResult<K>,
{
    let mut keyed = records
        .iter()
        .map(|r| Ok((key(r)?, r)))
        .collect::<AggregateResult<Vec<_>>>()?;

    // slice::sort_by is stable.
    if descending {
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
    } else {
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
    }

    Ok(records.derive(keyed.into_iter().map(|(_, r)| r.clone()).collect()))
}

/// Partition records by `key`. Groups appear in first-seen order and keep
/// input order internally.
pub fn group_by<F>(records: &RecordSet, key: F) -> AggregateResult<Grouping>
where
    F: Fn(&Record) -> AggregateResult<GroupKey>,
{
    let mut grouping = Grouping::new(records.columns().to_vec());
    for record in records {
        grouping.push(key(record)?, record.clone());
    }
    Ok(grouping)
}

/// Label of the first range containing `value`, or the unclassified sentinel.
pub fn classify(value: f64, ranges: &[BucketRange]) -> GroupKey {
    ranges
        .iter()
        .find(|range| range.contains(value))
        .map(|range| GroupKey::Label(range.label.clone()))
        .unwrap_or(GroupKey::Unclassified)
}

/// Group records by which range their numeric `field` falls in.
///
/// Ranges are tried in the order given, so a value sitting on a boundary
/// shared by two overlapping ranges lands in the one listed first. Values
/// matching no range go to [`GroupKey::Unclassified`], which stays in the
/// grouping for the caller to inspect.
pub fn bucket(records: &RecordSet, field: &str, ranges: &[BucketRange]) -> AggregateResult<Grouping> {
    records.require_column(field)?;
    for range in ranges {
        range.validate()?;
    }

    group_by(records, |record| Ok(classify(record.number(field)?, ranges)))
}

/// The record with the largest key. Ties go to the first one encountered.
pub fn max_by<K, F>(records: &RecordSet, key: F) -> AggregateResult<&Record>
where
    K: Ord,
    F: Fn(&Record) -> AggregateResult<K>,
{
    extremum(records, key, Ordering::Greater)
}

/// The record with the smallest key. Ties go to the first one encountered.
pub fn min_by<K, F>(records: &RecordSet, key: F) -> AggregateResult<&Record>
where
    K: Ord,
    F: Fn(&Record) -> AggregateResult<K>,
{
    extremum(records, key, Ordering::Less)
}

fn extremum<K, F>(records: &RecordSet, key: F, wanted: Ordering) -> AggregateResult<&Record>
where
    K: Ord,
    F: Fn(&Record) -> AggregateResult<K>,
{
    let mut best: Option<(K, &Record)> = None;

    for record in records {
        let candidate = key(record)?;
        // Only a strictly better key replaces the current pick.
        let better = match &best {
            Some((current, _)) => candidate.cmp(current) == wanted,
            None => true,
        };
        if better {
            best = Some((candidate, record));
        }
    }

    best.map(|(_, record)| record)
        .ok_or(AggregateError::EmptyInput)
}

/// Apply `reducer` to `field` in every group, keeping group order.
pub fn aggregate(
    grouping: &Grouping,
    field: &str,
    reducer: Reducer,
) -> AggregateResult<IndexMap<GroupKey, f64>> {
    grouping
        .iter()
        .map(|(key, group)| {
            let value = reduce(group, field, reducer)?
                .ok_or_else(|| AggregateError::EmptyGroup(key.to_string()))?;
            Ok((key.clone(), value))
        })
        .collect()
}

/// Apply `reducer` to `field` over a whole record set.
pub fn summarize(records: &RecordSet, field: &str, reducer: Reducer) -> AggregateResult<f64> {
    reduce(records, field, reducer)?.ok_or(AggregateError::EmptyInput)
}

/// All values of one column, in row order.
pub fn column(records: &RecordSet, name: &str) -> AggregateResult<Vec<Value>> {
    records.require_column(name)?;
    records.iter().map(|r| r.get(name).cloned()).collect()
}

/// Columns holding only numbers. Empty when the set has no rows.
pub fn numeric_columns(records: &RecordSet) -> Vec<String> {
    if records.is_empty() {
        return Vec::new();
    }

    records
        .columns()
        .iter()
        .filter(|c| {
            records
                .iter()
                .all(|r| matches!(r.get(c), Ok(Value::Number(_))))
        })
        .cloned()
        .collect()
}

// `None` means the reducer has no defined value over zero records.
fn reduce(records: &RecordSet, field: &str, reducer: Reducer) -> AggregateResult<Option<f64>> {
    records.require_column(field)?;

    let numbers = || records.iter().map(|r| r.number(field));

    let result: Option<f64> = match reducer {
        Reducer::Count => Some(records.len() as f64),
        Reducer::Sum => Some(numbers().sum::<AggregateResult<f64>>()?),
        Reducer::Average if records.is_empty() => None,
        Reducer::Average => {
            Some(numbers().sum::<AggregateResult<f64>>()? / records.len() as f64)
        }
        Reducer::Min => numbers()
            .collect::<AggregateResult<Vec<f64>>>()?
            .into_iter()
            .min_by(f64::total_cmp),
        Reducer::Max => numbers()
            .collect::<AggregateResult<Vec<f64>>>()?
            .into_iter()
            .max_by(f64::total_cmp),
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: f64, variety: &str) -> Record {
        Record::new().with("x", x).with("variety", variety)
    }

    fn table(rows: &[(f64, &str)]) -> RecordSet {
        RecordSet::new(
            vec!["x".to_string(), "variety".to_string()],
            rows.iter().map(|(x, v)| record(*x, v)).collect(),
        )
        .unwrap()
    }

    fn four() -> RecordSet {
        table(&[(5.1, "A"), (7.0, "B"), (4.3, "A"), (6.2, "A")])
    }

    fn xs(records: &RecordSet) -> Vec<f64> {
        records.iter().map(|r| r.number("x").unwrap()).collect()
    }

    fn is_a(r: &Record) -> AggregateResult<bool> {
        Ok(r.get("variety")? == &Value::from("A"))
    }

    #[test]
    fn test_project() {
        let projected = project(&four(), &["variety", "variety"]).unwrap();
        assert_eq!(projected.columns(), ["variety"]);
        assert_eq!(projected.len(), 4);
        assert!(projected.get(0).unwrap().get("x").is_err());

        let reordered = project(&four(), &["variety", "x"]).unwrap();
        assert_eq!(reordered.columns(), ["variety", "x"]);
    }

    #[test]
    fn test_project_unknown_column() {
        assert_eq!(
            project(&four(), &["x", "petalwidth"]),
            Err(AggregateError::UnknownColumn("petalwidth".to_string()))
        );
        // The schema is checked even when there are no rows.
        let empty = RecordSet::empty(vec!["x".to_string()]);
        assert!(project(&empty, &["y"]).is_err());
    }

    #[test]
    fn test_filter_and_reject_partition() {
        let rows = four();
        let kept = filter(&rows, is_a).unwrap();
        let rejected = reject(&rows, is_a).unwrap();

        assert_eq!(xs(&kept), vec![5.1, 4.3, 6.2]);
        assert_eq!(xs(&rejected), vec![7.0]);
        assert_eq!(kept.len() + rejected.len(), rows.len());
        assert_eq!(kept.columns(), rows.columns());
    }

    #[test]
    fn test_filter_propagates_missing_column() {
        let result = filter(&four(), |r| Ok(r.get("species")? == &Value::from("A")));
        assert_eq!(
            result,
            Err(AggregateError::UnknownColumn("species".to_string()))
        );
    }

    #[test]
    fn test_sort_by_ascending_and_descending() {
        let rows = four();
        let ascending = sort_by(&rows, by_column("x"), false).unwrap();
        assert_eq!(xs(&ascending), vec![4.3, 5.1, 6.2, 7.0]);

        let descending = sort_by(&rows, by_column("x"), true).unwrap();
        assert_eq!(xs(&descending), vec![7.0, 6.2, 5.1, 4.3]);

        // Input untouched.
        assert_eq!(xs(&rows), vec![5.1, 7.0, 4.3, 6.2]);
    }

    #[test]
    fn test_sort_by_is_stable() {
        let rows = table(&[(1.0, "b"), (2.0, "a"), (3.0, "b"), (4.0, "a")]);

        let ascending = sort_by(&rows, by_column("variety"), false).unwrap();
        assert_eq!(xs(&ascending), vec![2.0, 4.0, 1.0, 3.0]);

        let descending = sort_by(&rows, by_column("variety"), true).unwrap();
        assert_eq!(xs(&descending), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let rows = four();
        let grouping = group_by(&rows, key_of("variety")).unwrap();

        let keys: Vec<String> = grouping.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["A", "B"]);

        let a = grouping.get(&GroupKey::from(Value::from("A"))).unwrap();
        let expected = [&rows.records()[0], &rows.records()[2], &rows.records()[3]];
        assert!(a.iter().eq(expected));
        let b = grouping.get(&GroupKey::from(Value::from("B"))).unwrap();
        assert!(b.iter().eq([&rows.records()[1]]));
    }

    #[test]
    fn test_group_by_flatten_keeps_within_group_order() {
        let rows = table(&[(1.0, "b"), (2.0, "a"), (3.0, "b"), (4.0, "c"), (5.0, "a")]);
        let flat = group_by(&rows, key_of("variety")).unwrap().flatten();

        assert_eq!(xs(&flat), vec![1.0, 3.0, 2.0, 5.0, 4.0]);
        assert_eq!(flat.len(), rows.len());
    }

    #[test]
    fn test_group_by_derived_key() {
        let rows = four();
        let grouping = group_by(&rows, |r| {
            Ok(GroupKey::from(if r.number("x")? >= 6.0 { "big" } else { "small" }))
        })
        .unwrap();

        assert_eq!(grouping.get(&GroupKey::from("small")).map(|g| g.len()), Some(2));
        assert_eq!(grouping.get(&GroupKey::from("big")).map(|g| g.len()), Some(2));
    }

    fn heights() -> Vec<BucketRange> {
        vec![
            BucketRange::new(0.0, 4.0, "short"),
            BucketRange::new(4.0, 6.0, "medium"),
            BucketRange::new(6.0, 8.0, "tall"),
        ]
    }

    #[test]
    fn test_classify_boundaries() {
        let ranges = heights();
        assert_eq!(classify(4.0, &ranges), GroupKey::from("medium"));
        assert_eq!(classify(3.99, &ranges), GroupKey::from("short"));
        assert_eq!(classify(0.0, &ranges), GroupKey::from("short"));
        assert_eq!(classify(8.0, &ranges), GroupKey::Unclassified);
        assert_eq!(classify(10.0, &ranges), GroupKey::Unclassified);
        assert_eq!(classify(-1.0, &ranges), GroupKey::Unclassified);
    }

    #[test]
    fn test_classify_first_listed_range_wins() {
        let overlapping = vec![
            BucketRange::new(4.0, 6.0, "first"),
            BucketRange::new(3.0, 5.0, "second"),
        ];
        assert_eq!(classify(4.5, &overlapping), GroupKey::from("first"));
        assert_eq!(classify(3.5, &overlapping), GroupKey::from("second"));
    }

    #[test]
    fn test_bucket_keeps_unclassified_group() {
        let rows = table(&[(5.1, "A"), (10.0, "B"), (4.0, "A"), (7.0, "B"), (2.0, "A")]);
        let grouping = bucket(&rows, "x", &heights()).unwrap();

        let keys: Vec<String> = grouping.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["medium", "error", "tall", "short"]);
        assert_eq!(xs(grouping.unclassified().unwrap()), vec![10.0]);
        assert_eq!(xs(grouping.get(&GroupKey::from("medium")).unwrap()), vec![5.1, 4.0]);
    }

    #[test]
    fn test_bucket_errors() {
        let rows = four();
        assert_eq!(
            bucket(&rows, "height", &heights()).unwrap_err(),
            AggregateError::UnknownColumn("height".to_string())
        );
        assert!(matches!(
            bucket(&rows, "variety", &heights()),
            Err(AggregateError::NonNumeric { .. })
        ));
        assert!(matches!(
            bucket(&rows, "x", &[BucketRange::new(5.0, 1.0, "bad")]),
            Err(AggregateError::InvalidBucket { .. })
        ));
    }

    #[test]
    fn test_max_and_min_by() {
        let rows = four();
        let max = max_by(&rows, by_column("x")).unwrap();
        let min = min_by(&rows, by_column("x")).unwrap();

        assert_eq!(max.number("x"), Ok(7.0));
        assert_eq!(min.number("x"), Ok(4.3));
    }

    #[test]
    fn test_extremum_ties_pick_first() {
        let rows = table(&[(1.0, "first"), (9.0, "a"), (9.0, "b"), (1.0, "last")]);

        let max = max_by(&rows, by_column("x")).unwrap();
        assert_eq!(max.get("variety"), Ok(&Value::from("a")));

        let min = min_by(&rows, by_column("x")).unwrap();
        assert_eq!(min.get("variety"), Ok(&Value::from("first")));
    }

    #[test]
    fn test_extremum_empty_input() {
        let empty = RecordSet::empty(vec!["x".to_string()]);
        assert_eq!(max_by(&empty, by_column("x")), Err(AggregateError::EmptyInput));
        assert_eq!(min_by(&empty, by_column("x")), Err(AggregateError::EmptyInput));
    }

    #[test]
    fn test_aggregate_count() {
        let grouping = group_by(&four(), key_of("variety")).unwrap();
        let counts = aggregate(&grouping, "x", Reducer::Count).unwrap();

        let expected: IndexMap<GroupKey, f64> = [
            (GroupKey::from(Value::from("A")), 3.0),
            (GroupKey::from(Value::from("B")), 1.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn test_aggregate_average_matches_sum_over_count() {
        let grouping = group_by(&four(), key_of("variety")).unwrap();
        let sums = aggregate(&grouping, "x", Reducer::Sum).unwrap();
        let counts = aggregate(&grouping, "x", Reducer::Count).unwrap();
        let averages = aggregate(&grouping, "x", Reducer::Average).unwrap();

        for (key, average) in &averages {
            assert!((average - sums[key] / counts[key]).abs() < 1e-9);
        }
        assert!((averages[&GroupKey::from(Value::from("A"))] - 15.6 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_min_max() {
        let grouping = group_by(&four(), key_of("variety")).unwrap();
        let key = GroupKey::from(Value::from("A"));

        assert_eq!(aggregate(&grouping, "x", Reducer::Min).unwrap()[&key], 4.3);
        assert_eq!(aggregate(&grouping, "x", Reducer::Max).unwrap()[&key], 6.2);
    }

    #[test]
    fn test_aggregate_empty_group() {
        let grouping = Grouping::from_groups([
            (GroupKey::from("full"), table(&[(1.0, "A")])),
            (GroupKey::from("hollow"), table(&[])),
        ])
        .unwrap();

        assert_eq!(
            aggregate(&grouping, "x", Reducer::Average),
            Err(AggregateError::EmptyGroup("hollow".to_string()))
        );
        let sums = aggregate(&grouping, "x", Reducer::Sum).unwrap();
        assert_eq!(sums[&GroupKey::from("hollow")], 0.0);
        let counts = aggregate(&grouping, "x", Reducer::Count).unwrap();
        assert_eq!(counts[&GroupKey::from("hollow")], 0.0);
    }

    #[test]
    fn test_aggregate_never_coerces() {
        let grouping = group_by(&four(), key_of("variety")).unwrap();
        assert_eq!(
            aggregate(&grouping, "petalwidth", Reducer::Count),
            Err(AggregateError::UnknownColumn("petalwidth".to_string()))
        );
        assert!(matches!(
            aggregate(&grouping, "variety", Reducer::Sum),
            Err(AggregateError::NonNumeric { .. })
        ));
    }

    #[test]
    fn test_summarize() {
        assert!((summarize(&four(), "x", Reducer::Average).unwrap() - 5.65).abs() < 1e-9);
        assert_eq!(
            summarize(&table(&[]), "x", Reducer::Max),
            Err(AggregateError::EmptyInput)
        );
    }

    #[test]
    fn test_column_access() {
        let values = column(&four(), "variety").unwrap();
        assert_eq!(
            values,
            vec![Value::from("A"), Value::from("B"), Value::from("A"), Value::from("A")]
        );
        assert!(column(&four(), "petalwidth").is_err());
    }

    #[test]
    fn test_numeric_columns() {
        assert_eq!(numeric_columns(&four()), vec!["x"]);
        assert!(numeric_columns(&table(&[])).is_empty());
    }
}
