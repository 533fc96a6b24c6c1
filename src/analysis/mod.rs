mod baseline;
mod bucketing;
mod comparison;
mod monthly_metrics;
mod regime;
mod savings;
mod series;
mod stats;

use chrono::{DateTime, Utc};
use log::{info, warn};

pub use baseline::Baseline;
pub use series::{MergeRule, MonthlySeries};

use crate::config::EstimatorConfig;
use crate::error::{DeployLensError, Result};
use crate::insights::{
    BaselineOrigin, ImpactReport, MonthlyReportRow, MonthlySummary, SavingsSummary,
};
use crate::month::MonthKey;
use crate::sources::DeploymentEvent;

/// Everything the pipeline consumes, already parsed and validated.
pub struct AnalysisInputs {
    pub deployments: Vec<DeploymentEvent>,
    /// Infrastructure cost per month; netted out of post-cutover savings.
    pub infra_costs: MonthlySeries,
    /// Reported alongside the monthly rows only.
    pub auxiliary: Vec<MonthlySeries>,
}

/// Bucket deployments by month and summarize each month.
pub fn summarize_months(
    events: &[DeploymentEvent],
    cutover: DateTime<Utc>,
) -> Vec<MonthlySummary> {
    bucketing::bucket_by_month(events)
        .into_iter()
        .map(|(month, bucket)| {
            let classification = regime::classify_month(&bucket, cutover);
            if classification.straddles_cutover {
                warn!(
                    "Month {month} straddles the cutover instant and is classified as {}",
                    if classification.is_post_cutover {
                        "post-cutover"
                    } else {
                        "pre-cutover"
                    }
                );
            }
            monthly_metrics::calculate_monthly_summary(month, &bucket, classification)
        })
        .collect()
}

/// Run the full pipeline: aggregate, classify, estimate, join.
///
/// `now` only stamps the report metadata; identical inputs and `now` give an
/// identical report.
pub fn analyze(
    inputs: &AnalysisInputs,
    config: EstimatorConfig,
    baseline_origin: BaselineOrigin,
    now: DateTime<Utc>,
) -> Result<ImpactReport> {
    if inputs.deployments.is_empty() {
        warn!("No deployment records to analyze");
    }
    if inputs.infra_costs.is_empty() {
        warn!(
            "Series '{}' has no samples; infra cost counts as zero everywhere",
            inputs.infra_costs.name()
        );
    } else {
        info!(
            "Series '{}' covers {} months",
            inputs.infra_costs.name(),
            inputs.infra_costs.len()
        );
    }

    let summaries = summarize_months(&inputs.deployments, config.cutover);
    info!("Summarized {} months", summaries.len());
    warn_on_uniform_regime(&summaries);

    let config = match baseline_origin {
        BaselineOrigin::Configured => config,
        BaselineOrigin::PreCutoverData => {
            let derived = Baseline::from_pre_cutover(&summaries).ok_or_else(|| {
                DeployLensError::ConfigError(
                    "cannot derive a baseline: no pre-cutover months in the data".to_string(),
                )
            })?;
            info!(
                "Derived baseline from pre-cutover data: {:.2} days, {:.3} failure rate, {:.1} deployments/month",
                derived.avg_days, derived.failure_rate, derived.monthly_volume
            );
            config.with_baseline(derived)
        }
    };

    let estimator = savings::SavingsEstimator::new(config)?;
    let breakdowns = estimator.estimate_all(&summaries, &inputs.infra_costs);
    let totals = savings::summarize_totals(&summaries, &breakdowns);

    let series: Vec<MonthlySeries> = std::iter::once(inputs.infra_costs.clone())
        .chain(inputs.auxiliary.iter().cloned())
        .collect();
    let months: Vec<MonthKey> = summaries.iter().map(|s| s.month).collect();
    let joined = series::join_series(&months, &series);

    let rows: Vec<MonthlyReportRow> = summaries
        .iter()
        .zip(breakdowns)
        .zip(joined)
        .map(|((summary, savings), joined)| MonthlyReportRow {
            month: summary.month,
            summary: summary.clone(),
            savings,
            series: joined.values,
        })
        .collect();

    let config = estimator.config().clone();
    let comparison = comparison::compare_regimes(&inputs.deployments, config.cutover);

    info!(
        "Total net savings over {} post-cutover months: ${:.2} (average ${:.2}/month)",
        totals.post_cutover_months, totals.total_net_savings, totals.average_monthly_net_savings
    );

    Ok(ImpactReport {
        generated_at: now,
        cutover: config.cutover,
        baseline: config.baseline,
        baseline_origin,
        total_months: rows.len(),
        summary: SavingsSummary {
            total_savings_usd: totals.total_net_savings,
            average_monthly_savings_usd: totals.average_monthly_net_savings,
            calculation_date: now,
            methodology: savings::METHODOLOGY.to_string(),
            period: describe_period(&summaries),
            key_assumptions: config,
        },
        months: rows,
        totals,
        comparison,
    })
}

fn warn_on_uniform_regime(summaries: &[MonthlySummary]) {
    if summaries.is_empty() {
        return;
    }
    if summaries.iter().all(|s| s.is_post_cutover) {
        warn!("Cutover precedes every observed month; all months are post-cutover");
    } else if summaries.iter().all(|s| !s.is_post_cutover) {
        warn!("Cutover follows every observed month; no savings will be claimed");
    }
}

fn describe_period(summaries: &[MonthlySummary]) -> String {
    let mut post = summaries.iter().filter(|s| s.is_post_cutover).map(|s| s.month);

    match (post.next(), post.last()) {
        (None, _) => "No post-cutover months observed".to_string(),
        (Some(first), None) => format!("Historical actual data for {first} (post-cutover)"),
        (Some(first), Some(last)) => {
            format!("Historical actual data from {first} to {last} (post-cutover)")
        }
    }
}
