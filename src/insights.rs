use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::Baseline;
use crate::config::EstimatorConfig;
use crate::month::MonthKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    pub generated_at: DateTime<Utc>,
    pub cutover: DateTime<Utc>,
    pub baseline: Baseline,
    pub baseline_origin: BaselineOrigin,
    pub total_months: usize,
    pub months: Vec<MonthlyReportRow>,
    pub totals: SavingsTotals,
    pub comparison: RegimeComparison,
    pub summary: SavingsSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineOrigin {
    Configured,
    PreCutoverData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub total_count: usize,
    pub completed_count: usize,
    pub deployed_count: usize,
    /// Fraction in `[0, 1]`.
    pub completion_rate: f64,
    pub mean_elapsed_days: f64,
    pub median_elapsed_days: f64,
    pub p90_elapsed_days: f64,
    /// Percentage in `[0, 100]`.
    pub auto_trigger_pct: f64,
    pub is_post_cutover: bool,
    pub straddles_cutover: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsBreakdown {
    pub month: MonthKey,
    pub time_savings: f64,
    pub failure_savings: f64,
    pub testing_savings: f64,
    pub opportunity_savings: f64,
    pub total_savings: f64,
    /// Zero when the month has no cost sample.
    pub infra_cost: f64,
    pub net_savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyReportRow {
    pub month: MonthKey,
    pub summary: MonthlySummary,
    pub savings: SavingsBreakdown,
    /// Auxiliary series by name; `None` is "no data", not zero.
    pub series: IndexMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavingsTotals {
    pub post_cutover_months: usize,
    pub total_net_savings: f64,
    pub average_monthly_net_savings: f64,
}

/// Machine-readable summary kept alongside the figures for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsSummary {
    pub total_savings_usd: f64,
    pub average_monthly_savings_usd: f64,
    pub calculation_date: DateTime<Utc>,
    pub methodology: String,
    pub period: String,
    pub key_assumptions: EstimatorConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub total_count: usize,
    pub completed_count: usize,
    pub deployed_count: usize,
    /// Percentage in `[0, 100]`.
    pub completion_rate_pct: f64,
    pub avg_elapsed_days: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Improvements {
    pub completion_rate_change_pts: f64,
    pub completion_rate_multiplier: f64,
    pub elapsed_time_reduction_pct: f64,
    pub elapsed_time_reduction_hours: f64,
    pub deployed_volume_increase_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeComparison {
    pub before: PeriodMetrics,
    pub after: PeriodMetrics,
    pub improvements: Improvements,
}
