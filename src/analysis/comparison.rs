use chrono::{DateTime, Utc};

use super::stats::{compute_mean, ratio};
use crate::insights::{Improvements, PeriodMetrics, RegimeComparison};
use crate::sources::DeploymentEvent;

/// Before/after metrics with each event split individually at the cutover.
pub fn compare_regimes(events: &[DeploymentEvent], cutover: DateTime<Utc>) -> RegimeComparison {
    let (after, before): (Vec<&DeploymentEvent>, Vec<&DeploymentEvent>) = events
        .iter()
        .partition(|e| e.branch_created_at >= cutover);

    let before = period_metrics(&before);
    let after = period_metrics(&after);
    let improvements = improvements(&before, &after);

    RegimeComparison {
        before,
        after,
        improvements,
    }
}

fn period_metrics(events: &[&DeploymentEvent]) -> PeriodMetrics {
    let completed_count = events.iter().filter(|e| e.is_completed()).count();
    let elapsed: Vec<f64> = events
        .iter()
        .filter(|e| e.has_elapsed_time())
        .map(|e| e.elapsed_days)
        .collect();

    PeriodMetrics {
        total_count: events.len(),
        completed_count,
        deployed_count: elapsed.len(),
        completion_rate_pct: ratio(completed_count, events.len()) * 100.0,
        avg_elapsed_days: compute_mean(&elapsed),
    }
}

#[allow(clippy::cast_precision_loss)]
fn improvements(before: &PeriodMetrics, after: &PeriodMetrics) -> Improvements {
    let completion_rate_multiplier = if before.completion_rate_pct > 0.0 {
        after.completion_rate_pct / before.completion_rate_pct
    } else {
        0.0
    };

    let elapsed_time_reduction_pct = if before.avg_elapsed_days > 0.0 {
        (before.avg_elapsed_days - after.avg_elapsed_days) / before.avg_elapsed_days * 100.0
    } else {
        0.0
    };

    let deployed_volume_increase_pct = if before.deployed_count > 0 {
        (after.deployed_count as f64 - before.deployed_count as f64)
            / before.deployed_count as f64
            * 100.0
    } else {
        0.0
    };

    Improvements {
        completion_rate_change_pts: after.completion_rate_pct - before.completion_rate_pct,
        completion_rate_multiplier,
        elapsed_time_reduction_pct,
        elapsed_time_reduction_hours: (before.avg_elapsed_days - after.avg_elapsed_days) * 24.0,
        deployed_volume_increase_pct,
    }
}
