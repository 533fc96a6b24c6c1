use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use super::bucketing::bucket_by_month;
use crate::month::MonthKey;
use crate::sources::{MetricSample, Timestamped};

/// How several samples in one month collapse to the month's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRule {
    /// Temporally latest sample wins; on equal timestamps the later input row.
    Last,
    /// Temporally earliest sample wins; on equal timestamps the earlier row.
    First,
    Sum,
}

impl FromStr for MergeRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "first" => Ok(Self::First),
            "sum" => Ok(Self::Sum),
            other => Err(format!("unknown merge rule '{other}' (expected last, first or sum)")),
        }
    }
}

/// A named series keyed by month. A month may be present with no value,
/// which is kept distinct from an observed zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    name: String,
    values: BTreeMap<MonthKey, Option<f64>>,
}

impl MonthlySeries {
    pub fn from_samples(name: &str, samples: &[MetricSample], rule: MergeRule) -> Self {
        let values = bucket_by_month(samples)
            .into_iter()
            .filter_map(|(month, bucket)| merge(&bucket, rule).map(|v| (month, Some(v))))
            .collect();

        Self {
            name: name.to_string(),
            values,
        }
    }

    /// Build from entries that are already keyed by month. A repeated month
    /// keeps its last observed value; an empty entry never replaces one.
    pub fn from_monthly<I>(name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (MonthKey, Option<f64>)>,
    {
        let values = entries
            .into_iter()
            .fold(BTreeMap::new(), |mut acc, (month, value)| {
                match value {
                    Some(v) => {
                        acc.insert(month, Some(v));
                    }
                    None => {
                        acc.entry(month).or_insert(None);
                    }
                }
                acc
            });

        Self {
            name: name.to_string(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, month: MonthKey) -> Option<f64> {
        self.values.get(&month).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn merge(bucket: &[&MetricSample], rule: MergeRule) -> Option<f64> {
    match rule {
        MergeRule::Last => bucket
            .iter()
            .copied()
            .reduce(|kept, s| if s.timestamp() >= kept.timestamp() { s } else { kept })
            .map(|s| s.value),
        MergeRule::First => bucket
            .iter()
            .copied()
            .reduce(|kept, s| if s.timestamp() < kept.timestamp() { s } else { kept })
            .map(|s| s.value),
        MergeRule::Sum => (!bucket.is_empty()).then(|| bucket.iter().map(|s| s.value).sum()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub month: MonthKey,
    pub values: IndexMap<String, Option<f64>>,
}

/// Align auxiliary series onto the primary month index.
///
/// Every primary month appears exactly once, in chronological order. A series
/// without a value for a month contributes `None`. Months that exist only in
/// auxiliary series are not represented.
pub fn join_series(primary: &[MonthKey], series: &[MonthlySeries]) -> Vec<JoinedRow> {
    let months: BTreeSet<MonthKey> = primary.iter().copied().collect();

    for s in series {
        let outside = s.values.keys().filter(|m| !months.contains(m)).count();
        if outside > 0 {
            debug!(
                "Series '{}' has {outside} month(s) outside the primary index",
                s.name
            );
        }
    }

    months
        .into_iter()
        .map(|month| JoinedRow {
            month,
            values: series
                .iter()
                .map(|s| (s.name.clone(), s.get(month)))
                .collect(),
        })
        .collect()
}
