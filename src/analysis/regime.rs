use chrono::{DateTime, Utc};

use crate::sources::Timestamped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_post_cutover: bool,
    /// The month holds records on both sides of the cutover instant.
    pub straddles_cutover: bool,
}

/// Classify a whole month by its earliest record.
///
/// A month is post-cutover when its first chronological record is at or after
/// the cutover instant. Months that straddle the cutover are still classified
/// as a unit; they are only flagged. An empty month is pre-cutover.
pub fn classify_month<T: Timestamped>(records: &[&T], cutover: DateTime<Utc>) -> Classification {
    let first = records.iter().map(|r| r.timestamp()).min();
    let last = records.iter().map(|r| r.timestamp()).max();

    match (first, last) {
        (Some(first), Some(last)) => Classification {
            is_post_cutover: first >= cutover,
            straddles_cutover: first < cutover && last >= cutover,
        },
        _ => Classification::default(),
    }
}
