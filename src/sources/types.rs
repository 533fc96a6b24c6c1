use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that can be placed on the calendar by a single instant.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// How a production deployment was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Auto,
    Manual,
}

impl TriggerKind {
    /// Only the literal `auto` marks an automatic trigger.
    pub fn from_label(label: &str) -> Self {
        if label.trim() == "auto" {
            Self::Auto
        } else {
            Self::Manual
        }
    }
}

/// One branch-to-production deployment record.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentEvent {
    /// When the feature branch was created; the bucketing timestamp.
    pub branch_created_at: DateTime<Utc>,
    /// When the production deploy job finished, if it ever did.
    pub deployed_at: Option<DateTime<Utc>>,
    /// Days from branch creation to deploy. Values <= 0 mean "not applicable".
    pub elapsed_days: f64,
    pub trigger: TriggerKind,
}

impl DeploymentEvent {
    pub fn is_completed(&self) -> bool {
        self.deployed_at.is_some()
    }

    pub fn has_elapsed_time(&self) -> bool {
        self.elapsed_days > 0.0
    }
}

impl Timestamped for DeploymentEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.branch_created_at
    }
}

/// A dated observation of a numeric metric (infra cost, coverage, test count).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub sampled_at: DateTime<Utc>,
    pub value: f64,
}

impl Timestamped for MetricSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.sampled_at
    }
}
