use super::series::MonthlySeries;
use crate::config::EstimatorConfig;
use crate::error::Result;
use crate::insights::{MonthlySummary, SavingsBreakdown, SavingsTotals};

pub const METHODOLOGY: &str =
    "Developer time savings + failure cost reduction + testing efficiency + opportunity costs";

/// Weighted savings model evaluated per month against a fixed baseline.
pub struct SavingsEstimator {
    config: EstimatorConfig,
}

impl SavingsEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Lead-time days saved per deployment, floored at 0.
    pub fn days_saved(&self, summary: &MonthlySummary) -> f64 {
        (self.config.baseline.avg_days - summary.mean_elapsed_days).max(0.0)
    }

    /// Baseline failures minus the month's failures, floored at 0.
    #[allow(clippy::cast_precision_loss)]
    pub fn failures_avoided(&self, summary: &MonthlySummary) -> f64 {
        let actual = summary.total_count as f64 * (1.0 - summary.completion_rate);
        (self.config.baseline.expected_failures() - actual).max(0.0)
    }

    /// Savings for one month. Pre-cutover months claim nothing; the infra cost
    /// is still recorded. A missing cost sample counts as zero cost.
    #[allow(clippy::cast_precision_loss)]
    pub fn estimate(&self, summary: &MonthlySummary, infra_cost: Option<f64>) -> SavingsBreakdown {
        let infra_cost = infra_cost.unwrap_or(0.0);

        if !summary.is_post_cutover {
            return SavingsBreakdown {
                month: summary.month,
                time_savings: 0.0,
                failure_savings: 0.0,
                testing_savings: 0.0,
                opportunity_savings: 0.0,
                total_savings: 0.0,
                infra_cost,
                net_savings: 0.0,
            };
        }

        let rates = &self.config.rates;
        let weights = &self.config.weights;
        let deployments = summary.total_count as f64;
        let days_saved = self.days_saved(summary);

        let time_savings = days_saved
            * weights.productive_hours_per_day_saved
            * rates.dev_hourly_rate
            * deployments
            * weights.time_impact_factor;

        let failure_savings =
            self.failures_avoided(summary) * self.config.failure_cost_per_incident();

        let testing_savings = deployments
            * weights.manual_testing_hours_saved
            * rates.dev_hourly_rate
            * weights.testing_reduction_factor;

        let opportunity_savings = days_saved
            * deployments
            * rates.revenue_per_feature_per_day
            * weights.revenue_feature_factor;

        let total_savings = time_savings + failure_savings + testing_savings + opportunity_savings;

        SavingsBreakdown {
            month: summary.month,
            time_savings,
            failure_savings,
            testing_savings,
            opportunity_savings,
            total_savings,
            infra_cost,
            net_savings: total_savings - infra_cost,
        }
    }

    pub fn estimate_all(
        &self,
        summaries: &[MonthlySummary],
        infra_costs: &MonthlySeries,
    ) -> Vec<SavingsBreakdown> {
        summaries
            .iter()
            .map(|summary| self.estimate(summary, infra_costs.get(summary.month)))
            .collect()
    }
}

/// Sum and average net savings over post-cutover months.
#[allow(clippy::cast_precision_loss)]
pub fn summarize_totals(summaries: &[MonthlySummary], savings: &[SavingsBreakdown]) -> SavingsTotals {
    let post: Vec<f64> = summaries
        .iter()
        .zip(savings)
        .filter(|(summary, _)| summary.is_post_cutover)
        .map(|(_, breakdown)| breakdown.net_savings)
        .collect();

    let total_net_savings = post.iter().sum::<f64>();
    let average_monthly_net_savings = if post.is_empty() {
        0.0
    } else {
        total_net_savings / post.len() as f64
    };

    SavingsTotals {
        post_cutover_months: post.len(),
        total_net_savings,
        average_monthly_net_savings,
    }
}
