use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};

use super::timestamp::parse_timestamp;
use super::types::{DeploymentEvent, MetricSample, TriggerKind};
use crate::error::{DeployLensError, Result};
use crate::month::MonthKey;

/// Header names of the deployment export.
#[derive(Debug, Clone)]
pub struct DeploymentColumns {
    pub branch_created: String,
    pub deployed: String,
    pub elapsed_days: String,
    pub trigger: String,
}

impl Default for DeploymentColumns {
    fn default() -> Self {
        Self {
            branch_created: "branch_creation_datetime".to_string(),
            deployed: "deploy_prod_job_end_datetime".to_string(),
            elapsed_days: "days_elapsed_branch_to_deploy".to_string(),
            trigger: "deploy_prod_job_trigger".to_string(),
        }
    }
}

/// Header names of a dated sample export.
#[derive(Debug, Clone)]
pub struct SampleColumns {
    pub date: String,
    pub value: String,
}

impl SampleColumns {
    fn commit_dated(value: &str) -> Self {
        Self {
            date: "commit_date".to_string(),
            value: value.to_string(),
        }
    }

    pub fn infra_cost() -> Self {
        Self::commit_dated("ec2_cost_usd")
    }

    pub fn coverage() -> Self {
        Self::commit_dated("code_coverage")
    }

    pub fn e2e_tests() -> Self {
        Self::commit_dated("number_of_tests")
    }
}

pub fn load_deployments(path: &Path, columns: &DeploymentColumns) -> Result<Vec<DeploymentEvent>> {
    let file = open_input(path)?;
    let events = read_deployments(file, &path.display().to_string(), columns)?;
    info!("Loaded {} deployment records from {}", events.len(), path.display());
    Ok(events)
}

pub fn load_samples(path: &Path, columns: &SampleColumns) -> Result<Vec<MetricSample>> {
    let file = open_input(path)?;
    let samples = read_samples(file, &path.display().to_string(), columns)?;
    info!(
        "Loaded {} '{}' samples from {}",
        samples.len(),
        columns.value,
        path.display()
    );
    Ok(samples)
}

pub fn load_monthly_values(
    path: &Path,
    value_column: &str,
) -> Result<Vec<(MonthKey, Option<f64>)>> {
    let file = open_input(path)?;
    read_monthly_values(file, &path.display().to_string(), value_column)
}

/// Read deployment rows. Any row with an unusable required field aborts the read.
pub fn read_deployments<R: Read>(
    reader: R,
    origin: &str,
    columns: &DeploymentColumns,
) -> Result<Vec<DeploymentEvent>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let created_idx = column_index(&headers, origin, &columns.branch_created)?;
    let deployed_idx = column_index(&headers, origin, &columns.deployed)?;
    let elapsed_idx = column_index(&headers, origin, &columns.elapsed_days)?;
    let trigger_idx = column_index(&headers, origin, &columns.trigger)?;

    csv_reader
        .records()
        .enumerate()
        .map(|(i, record)| -> Result<DeploymentEvent> {
            let record = record?;
            let row = i as u64 + 1;
            let field = |idx: usize| record.get(idx).unwrap_or_default();

            let branch_created_at = parse_timestamp(field(created_idx)).ok_or_else(|| {
                malformed(
                    origin,
                    row,
                    format!(
                        "unparseable {} '{}'",
                        columns.branch_created,
                        field(created_idx)
                    ),
                )
            })?;

            let deployed_raw = field(deployed_idx);
            let deployed_at = if deployed_raw.is_empty() {
                None
            } else {
                Some(parse_timestamp(deployed_raw).ok_or_else(|| {
                    malformed(
                        origin,
                        row,
                        format!("unparseable {} '{deployed_raw}'", columns.deployed),
                    )
                })?)
            };

            let elapsed_raw = field(elapsed_idx);
            let elapsed_days = if elapsed_raw.is_empty() {
                0.0
            } else {
                parse_number(elapsed_raw, origin, row, &columns.elapsed_days)?
            };

            Ok(DeploymentEvent {
                branch_created_at,
                deployed_at,
                elapsed_days,
                trigger: TriggerKind::from_label(field(trigger_idx)),
            })
        })
        .collect()
}

/// Read dated samples; both the date and the value are required.
pub fn read_samples<R: Read>(
    reader: R,
    origin: &str,
    columns: &SampleColumns,
) -> Result<Vec<MetricSample>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let date_idx = column_index(&headers, origin, &columns.date)?;
    let value_idx = column_index(&headers, origin, &columns.value)?;

    csv_reader
        .records()
        .enumerate()
        .map(|(i, record)| -> Result<MetricSample> {
            let record = record?;
            let row = i as u64 + 1;
            let date_raw = record.get(date_idx).unwrap_or_default();
            let value_raw = record.get(value_idx).unwrap_or_default();

            let sampled_at = parse_timestamp(date_raw).ok_or_else(|| {
                malformed(
                    origin,
                    row,
                    format!("unparseable {} '{date_raw}'", columns.date),
                )
            })?;
            let value = parse_number(value_raw, origin, row, &columns.value)?;

            Ok(MetricSample { sampled_at, value })
        })
        .collect()
}

/// Read a series that is already keyed by month (`month` column, `YYYY-MM`).
///
/// An empty value cell is kept as an explicit "no data" entry.
pub fn read_monthly_values<R: Read>(
    reader: R,
    origin: &str,
    value_column: &str,
) -> Result<Vec<(MonthKey, Option<f64>)>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let month_idx = column_index(&headers, origin, "month")?;
    let value_idx = column_index(&headers, origin, value_column)?;

    let values = csv_reader
        .records()
        .enumerate()
        .map(|(i, record)| -> Result<(MonthKey, Option<f64>)> {
            let record = record?;
            let row = i as u64 + 1;
            let month_raw = record.get(month_idx).unwrap_or_default();
            let value_raw = record.get(value_idx).unwrap_or_default();

            let month: MonthKey = month_raw
                .parse()
                .map_err(|e: String| malformed(origin, row, e))?;
            let value = if value_raw.is_empty() {
                None
            } else {
                Some(parse_number(value_raw, origin, row, value_column)?)
            };

            Ok((month, value))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Read {} monthly values from {origin}", values.len());
    Ok(values)
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| DeployLensError::InputFileError {
        path: path.display().to_string(),
        source,
    })
}

fn column_index(headers: &StringRecord, origin: &str, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| DeployLensError::MissingColumnError {
            origin: origin.to_string(),
            column: column.to_string(),
        })
}

fn parse_number(raw: &str, origin: &str, row: u64, column: &str) -> Result<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(origin, row, format!("non-numeric {column} '{raw}'")))
}

fn malformed(origin: &str, row: u64, reason: String) -> DeployLensError {
    DeployLensError::MalformedRecordError {
        origin: origin.to_string(),
        row,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const DEPLOYMENTS: &str = "\
pipeline_id,branch_creation_datetime,deploy_prod_job_end_datetime,days_elapsed_branch_to_deploy,deploy_prod_job_trigger
1,2023-11-02T09:00:00Z,2023-11-08T10:00:00Z,6.04,manual
2,2023-12-20 08:00:00+00:00,,0,auto
3,2024-01-05,2024-01-06T00:00:00.5Z,1.0,auto
";

    #[test]
    fn test_read_deployments_parses_rows() {
        let events =
            read_deployments(DEPLOYMENTS.as_bytes(), "deploys.csv", &DeploymentColumns::default())
                .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0].branch_created_at,
            Utc.with_ymd_and_hms(2023, 11, 2, 9, 0, 0).unwrap()
        );
        assert!(events[0].is_completed());
        assert_eq!(events[0].trigger, TriggerKind::Manual);

        assert!(!events[1].is_completed());
        assert!(!events[1].has_elapsed_time());
        assert_eq!(events[1].trigger, TriggerKind::Auto);

        assert!((events[2].elapsed_days - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_deployments_empty_elapsed_is_not_applicable() {
        let csv = "branch_creation_datetime,deploy_prod_job_end_datetime,days_elapsed_branch_to_deploy,deploy_prod_job_trigger\n\
                   2024-01-01T00:00:00Z,,,manual\n";
        let events =
            read_deployments(csv.as_bytes(), "d", &DeploymentColumns::default()).unwrap();

        assert_eq!(events.len(), 1);
        assert!(!events[0].has_elapsed_time());
    }

    #[test]
    fn test_read_deployments_rejects_malformed_timestamp_with_row() {
        let csv = "branch_creation_datetime,deploy_prod_job_end_datetime,days_elapsed_branch_to_deploy,deploy_prod_job_trigger\n\
                   2024-01-01T00:00:00Z,,1,auto\n\
                   not-a-date,,1,auto\n";
        let err = read_deployments(csv.as_bytes(), "deploys.csv", &DeploymentColumns::default())
            .unwrap_err();

        match err {
            DeployLensError::MalformedRecordError { origin, row, reason } => {
                assert_eq!(origin, "deploys.csv");
                assert_eq!(row, 2);
                assert!(reason.contains("not-a-date"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_deployments_rejects_malformed_completion_time() {
        let csv = "branch_creation_datetime,deploy_prod_job_end_datetime,days_elapsed_branch_to_deploy,deploy_prod_job_trigger\n\
                   2024-01-01T00:00:00Z,soon,1,auto\n";
        let result = read_deployments(csv.as_bytes(), "d", &DeploymentColumns::default());

        assert!(matches!(
            result,
            Err(DeployLensError::MalformedRecordError { row: 1, .. })
        ));
    }

    #[test]
    fn test_read_deployments_missing_column() {
        let csv = "branch_creation_datetime,days_elapsed_branch_to_deploy\n2024-01-01,1\n";
        let result = read_deployments(csv.as_bytes(), "d", &DeploymentColumns::default());

        match result {
            Err(DeployLensError::MissingColumnError { column, .. }) => {
                assert_eq!(column, "deploy_prod_job_end_datetime");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_deployments_empty_input() {
        let csv = "branch_creation_datetime,deploy_prod_job_end_datetime,days_elapsed_branch_to_deploy,deploy_prod_job_trigger\n";
        let events =
            read_deployments(csv.as_bytes(), "d", &DeploymentColumns::default()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_read_samples() {
        let csv = "commit_date,ec2_cost_usd\n2024-01-03,120.5\n2024-01-28 12:00:00,130.25\n";
        let samples = read_samples(csv.as_bytes(), "ec2.csv", &SampleColumns::infra_cost()).unwrap();

        assert_eq!(samples.len(), 2);
        assert!((samples[1].value - 130.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_samples_rejects_non_numeric_value() {
        let csv = "commit_date,code_coverage\n2024-01-03,high\n";
        let result = read_samples(csv.as_bytes(), "cov.csv", &SampleColumns::coverage());

        assert!(matches!(
            result,
            Err(DeployLensError::MalformedRecordError { row: 1, .. })
        ));
    }

    #[test]
    fn test_read_monthly_values_keeps_gaps() {
        let csv = "month,count\n2023-09,4\n2023-10,\n2023-11,7\n";
        let values = read_monthly_values(csv.as_bytes(), "envs.csv", "count").unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0], (MonthKey::new(2023, 9).unwrap(), Some(4.0)));
        assert_eq!(values[1], (MonthKey::new(2023, 10).unwrap(), None));
    }

    #[test]
    fn test_read_monthly_values_rejects_bad_month() {
        let csv = "month,count\nSeptember,4\n";
        let result = read_monthly_values(csv.as_bytes(), "envs.csv", "count");

        assert!(matches!(
            result,
            Err(DeployLensError::MalformedRecordError { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let path = Path::new("/nonexistent/ec2_costs.csv");
        let err = load_samples(path, &SampleColumns::infra_cost()).unwrap_err();

        assert!(matches!(err, DeployLensError::InputFileError { .. }));
        assert!(err.to_string().contains("/nonexistent/ec2_costs.csv"));
    }
}
