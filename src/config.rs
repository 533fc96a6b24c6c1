use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::Baseline;
use crate::error::{DeployLensError, Result};

/// Immutable inputs of the savings model.
///
/// Every field is required when read from a file; the only built-in values
/// are the ones returned by [`EstimatorConfig::reference`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Instant after which the process change is assumed to be in effect.
    pub cutover: DateTime<Utc>,
    pub baseline: Baseline,
    pub rates: Rates,
    pub weights: Weights,
    /// Reported with the assumptions; not used by the model itself.
    pub team_size: u32,
}

/// Monetary rates in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rates {
    pub dev_hourly_rate: f64,
    pub stakeholder_hourly_rate: f64,
    pub revenue_per_feature_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    /// Developer hours recovered per day of lead time saved.
    pub productive_hours_per_day_saved: f64,
    /// Share of deployments whose time savings are actually realized.
    pub time_impact_factor: f64,
    pub incident_resolution_hours: f64,
    pub incident_stakeholder_hours: f64,
    pub manual_testing_hours_saved: f64,
    pub testing_reduction_factor: f64,
    /// Share of features that generate revenue.
    pub revenue_feature_factor: f64,
}

impl EstimatorConfig {
    /// The labeled reference scenario: a two-person team with auto-deploy
    /// enabled on 2023-12-12.
    pub fn reference() -> Self {
        Self {
            cutover: Utc
                .timestamp_millis_opt(1_702_390_384_057)
                .single()
                .unwrap_or_default(),
            baseline: Baseline {
                avg_days: 6.5,
                failure_rate: 0.941,
                monthly_volume: 25.0,
            },
            rates: Rates {
                dev_hourly_rate: 25.0,
                stakeholder_hourly_rate: 75.0,
                revenue_per_feature_per_day: 10.0,
            },
            weights: Weights {
                productive_hours_per_day_saved: 2.0,
                time_impact_factor: 0.3,
                incident_resolution_hours: 1.0,
                incident_stakeholder_hours: 0.5,
                manual_testing_hours_saved: 2.0,
                testing_reduction_factor: 0.2,
                revenue_feature_factor: 0.1,
            },
            team_size: 2,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).map_err(|source| DeployLensError::InputFileError {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_json(&raw).map_err(|e| match e {
            DeployLensError::JsonError(err) => {
                DeployLensError::ConfigError(format!("{}: {err}", path.display()))
            }
            other => other,
        })?;
        info!("Loaded estimator configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_cutover(mut self, cutover: DateTime<Utc>) -> Self {
        self.cutover = cutover;
        self
    }

    #[must_use]
    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.baseline.validate()?;

        let rates = &self.rates;
        non_negative("rates.dev_hourly_rate", rates.dev_hourly_rate)?;
        non_negative("rates.stakeholder_hourly_rate", rates.stakeholder_hourly_rate)?;
        non_negative(
            "rates.revenue_per_feature_per_day",
            rates.revenue_per_feature_per_day,
        )?;

        let weights = &self.weights;
        non_negative(
            "weights.productive_hours_per_day_saved",
            weights.productive_hours_per_day_saved,
        )?;
        non_negative(
            "weights.incident_resolution_hours",
            weights.incident_resolution_hours,
        )?;
        non_negative(
            "weights.incident_stakeholder_hours",
            weights.incident_stakeholder_hours,
        )?;
        non_negative(
            "weights.manual_testing_hours_saved",
            weights.manual_testing_hours_saved,
        )?;
        open_fraction("weights.time_impact_factor", weights.time_impact_factor)?;
        fraction(
            "weights.testing_reduction_factor",
            weights.testing_reduction_factor,
        )?;
        fraction("weights.revenue_feature_factor", weights.revenue_feature_factor)?;

        Ok(())
    }

    /// Resolution time plus stakeholder time for one failed deployment.
    pub fn failure_cost_per_incident(&self) -> f64 {
        self.weights.incident_resolution_hours * self.rates.dev_hourly_rate
            + self.weights.incident_stakeholder_hours * self.rates.stakeholder_hourly_rate
    }
}

pub(crate) fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DeployLensError::ConfigError(format!(
            "{name} must be a finite value >= 0, got {value}"
        )))
    }
}

pub(crate) fn fraction(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DeployLensError::ConfigError(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// Strictly between 0 and 1.
fn open_fraction(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(DeployLensError::ConfigError(format!(
            "{name} must be within (0, 1), got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_config_is_valid() {
        let config = EstimatorConfig::reference();
        assert!(config.validate().is_ok());
        assert_eq!(config.cutover.to_rfc3339(), "2023-12-12T14:13:04.057+00:00");
    }

    #[test]
    fn test_failure_cost_per_incident() {
        // 1h * $25 + 0.5h * $75
        let config = EstimatorConfig::reference();
        assert!((config.failure_cost_per_incident() - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_config_json_round_trip_through_file_format() {
        let config = EstimatorConfig::reference();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = EstimatorConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_missing_field_fails_loud() {
        let mut value = serde_json::to_value(EstimatorConfig::reference()).unwrap();
        value["baseline"]
            .as_object_mut()
            .unwrap()
            .remove("failure_rate");

        let result = EstimatorConfig::from_json(&value.to_string());
        assert!(matches!(result, Err(DeployLensError::JsonError(_))));
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let mut value = serde_json::to_value(EstimatorConfig::reference()).unwrap();
        value["rates"]["dev_hourly_rte"] = serde_json::json!(30.0);

        assert!(EstimatorConfig::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn test_config_rejects_out_of_range_factor() {
        let mut config = EstimatorConfig::reference();
        config.weights.time_impact_factor = 1.5;

        match config.validate() {
            Err(DeployLensError::ConfigError(msg)) => assert!(msg.contains("time_impact_factor")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_time_impact_factor_excludes_bounds() {
        for bound in [0.0, 1.0] {
            let mut config = EstimatorConfig::reference();
            config.weights.time_impact_factor = bound;

            match config.validate() {
                Err(DeployLensError::ConfigError(msg)) => {
                    assert!(msg.contains("(0, 1)"), "unexpected message: {msg}")
                }
                other => panic!("unexpected result for {bound}: {other:?}"),
            }
        }

        let mut config = EstimatorConfig::reference();
        config.weights.testing_reduction_factor = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_missing_file_names_path() {
        let err = EstimatorConfig::from_file(Path::new("/nonexistent/deploylens.json")).unwrap_err();
        assert!(matches!(err, DeployLensError::InputFileError { .. }));
        assert!(err.to_string().contains("/nonexistent/deploylens.json"));
    }

    #[test]
    fn test_config_rejects_negative_rate() {
        let mut config = EstimatorConfig::reference();
        config.rates.dev_hourly_rate = -1.0;
        assert!(config.validate().is_err());

        config.rates.dev_hourly_rate = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_cutover_overrides_only_cutover() {
        let cutover = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let config = EstimatorConfig::reference().with_cutover(cutover);

        assert_eq!(config.cutover, cutover);
        assert_eq!(config.baseline, EstimatorConfig::reference().baseline);
    }
}
