use std::collections::BTreeMap;

use crate::month::MonthKey;
use crate::sources::Timestamped;

/// Group records by the UTC calendar month of their timestamp.
///
/// Months come out in chronological order; records keep their input order
/// within a month.
pub fn bucket_by_month<T: Timestamped>(records: &[T]) -> BTreeMap<MonthKey, Vec<&T>> {
    records.iter().fold(BTreeMap::new(), |mut buckets, record| {
        buckets
            .entry(MonthKey::of(&record.timestamp()))
            .or_insert_with(Vec::new)
            .push(record);
        buckets
    })
}
