mod loader;
mod timestamp;
mod types;

pub use loader::{
    load_deployments, load_monthly_values, load_samples, DeploymentColumns, SampleColumns,
};
pub use timestamp::parse_timestamp;
pub use types::{DeploymentEvent, MetricSample, Timestamped, TriggerKind};
