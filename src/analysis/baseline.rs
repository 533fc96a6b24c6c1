use serde::{Deserialize, Serialize};

use crate::config::{fraction, non_negative};
use crate::error::Result;
use crate::insights::MonthlySummary;

/// The assumed "before" state used as the counterfactual for savings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Baseline {
    /// Average branch-to-deploy lead time in days.
    pub avg_days: f64,
    /// Share of deployments that never complete, in `[0, 1]`.
    pub failure_rate: f64,
    /// Deployments per month.
    pub monthly_volume: f64,
}

impl Baseline {
    pub fn validate(&self) -> Result<()> {
        non_negative("baseline.avg_days", self.avg_days)?;
        fraction("baseline.failure_rate", self.failure_rate)?;
        non_negative("baseline.monthly_volume", self.monthly_volume)
    }

    /// Expected failed deployments in a baseline month.
    pub fn expected_failures(&self) -> f64 {
        self.monthly_volume * self.failure_rate
    }

    /// Derive a baseline from the pre-cutover months of the observed data.
    ///
    /// Lead time is the mean over all deployed events (weighted by each
    /// month's deployed count), the failure rate is pooled over all events,
    /// and the volume is the mean monthly event count. Returns `None` when no
    /// pre-cutover month exists.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_pre_cutover(months: &[MonthlySummary]) -> Option<Self> {
        let pre: Vec<_> = months.iter().filter(|m| !m.is_post_cutover).collect();
        if pre.is_empty() {
            return None;
        }

        let deployed: usize = pre.iter().map(|m| m.deployed_count).sum();
        let total: usize = pre.iter().map(|m| m.total_count).sum();
        let completed: usize = pre.iter().map(|m| m.completed_count).sum();

        let avg_days = if deployed == 0 {
            0.0
        } else {
            pre.iter()
                .map(|m| m.mean_elapsed_days * m.deployed_count as f64)
                .sum::<f64>()
                / deployed as f64
        };

        let failure_rate = if total == 0 {
            0.0
        } else {
            1.0 - completed as f64 / total as f64
        };

        Some(Self {
            avg_days,
            failure_rate,
            monthly_volume: total as f64 / pre.len() as f64,
        })
    }
}
