use super::regime::Classification;
use super::stats::{compute_mean, median, quantile, ratio};
use crate::insights::MonthlySummary;
use crate::month::MonthKey;
use crate::sources::{DeploymentEvent, TriggerKind};

/// Reduce one month of deployment events to its summary row.
///
/// Lead-time statistics only consider events with a positive elapsed time;
/// every rate falls back to 0 for an empty month.
pub fn calculate_monthly_summary(
    month: MonthKey,
    events: &[&DeploymentEvent],
    classification: Classification,
) -> MonthlySummary {
    let total_count = events.len();
    let completed_count = events.iter().filter(|e| e.is_completed()).count();
    let auto_count = events
        .iter()
        .filter(|e| e.trigger == TriggerKind::Auto)
        .count();

    let elapsed: Vec<f64> = events
        .iter()
        .filter(|e| e.has_elapsed_time())
        .map(|e| e.elapsed_days)
        .collect();

    MonthlySummary {
        month,
        total_count,
        completed_count,
        deployed_count: elapsed.len(),
        completion_rate: ratio(completed_count, total_count),
        mean_elapsed_days: compute_mean(&elapsed),
        median_elapsed_days: median(&elapsed),
        p90_elapsed_days: quantile(&elapsed, 0.9),
        auto_trigger_pct: ratio(auto_count, total_count) * 100.0,
        is_post_cutover: classification.is_post_cutover,
        straddles_cutover: classification.straddles_cutover,
    }
}
