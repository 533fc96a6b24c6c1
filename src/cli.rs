use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;

use crate::analysis::{analyze, AnalysisInputs, MergeRule, MonthlySeries};
use crate::config::EstimatorConfig;
use crate::error::DeployLensError;
use crate::insights::BaselineOrigin;
use crate::report::write_monthly_table;
use crate::sources::{
    load_deployments, load_monthly_values, load_samples, parse_timestamp, DeploymentColumns,
    SampleColumns,
};

#[derive(Parser)]
#[command(name = "deploylens")]
#[command(author, version, about = "Deployment Impact & Savings Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the monthly profile and savings estimate
    Analyze {
        /// Deployment records CSV
        #[arg(short, long)]
        deployments: PathBuf,

        /// Infrastructure cost samples CSV (commit_date, ec2_cost_usd)
        #[arg(short, long)]
        costs: PathBuf,

        /// Unit-test coverage samples CSV (commit_date, code_coverage)
        #[arg(long)]
        coverage: Option<PathBuf>,

        /// E2E test count samples CSV (commit_date, number_of_tests)
        #[arg(long)]
        e2e: Option<PathBuf>,

        /// How several coverage samples in one month collapse to one value
        #[arg(long, default_value = "last")]
        coverage_merge: MergeRule,

        /// How several E2E test count samples in one month collapse to one value
        #[arg(long, default_value = "last")]
        e2e_merge: MergeRule,

        /// Month-keyed series as NAME[:COLUMN]=PATH (COLUMN defaults to "value")
        #[arg(long = "monthly", value_parser = parse_monthly_spec)]
        monthly: Vec<MonthlySpec>,

        /// Estimator configuration JSON
        #[arg(long, env = "DEPLOYLENS_CONFIG")]
        config: Option<PathBuf>,

        /// Use the built-in reference configuration instead of a file
        #[arg(long, default_value_t = false, conflicts_with = "config")]
        reference_config: bool,

        /// Override the configured cutover instant (ISO-8601)
        #[arg(long, value_parser = parse_cutover)]
        cutover: Option<DateTime<Utc>>,

        /// Derive the baseline from the pre-cutover months of the data
        #[arg(long, default_value_t = false)]
        baseline_from_data: bool,

        /// Also write the monthly table as CSV to this path
        #[arg(long)]
        table: Option<PathBuf>,
    },

    /// Print the reference estimator configuration
    Config,
}

#[derive(Debug, Clone)]
struct MonthlySpec {
    name: String,
    column: String,
    path: PathBuf,
}

fn parse_monthly_spec(raw: &str) -> std::result::Result<MonthlySpec, String> {
    let (label, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME[:COLUMN]=PATH, got '{raw}'"))?;

    let (name, column) = label.split_once(':').unwrap_or((label, "value"));
    if name.is_empty() || column.is_empty() || path.is_empty() {
        return Err(format!("expected NAME[:COLUMN]=PATH, got '{raw}'"));
    }

    Ok(MonthlySpec {
        name: name.to_string(),
        column: column.to_string(),
        path: PathBuf::from(path),
    })
}

fn parse_cutover(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("unparseable timestamp '{raw}'"))
}

impl Cli {
    pub fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Analyze {
                deployments,
                costs,
                coverage,
                e2e,
                coverage_merge,
                e2e_merge,
                monthly,
                config,
                reference_config,
                cutover,
                baseline_from_data,
                table,
            } => {
                let mut estimator_config = if *reference_config {
                    info!("Using the reference estimator configuration");
                    EstimatorConfig::reference()
                } else if let Some(path) = config {
                    EstimatorConfig::from_file(path)?
                } else {
                    return Err(DeployLensError::ConfigError(
                        "no estimator configuration given; pass --config <FILE> or --reference-config"
                            .to_string(),
                    )
                    .into());
                };
                if let Some(cutover) = cutover {
                    info!("Overriding cutover instant with {cutover}");
                    estimator_config = estimator_config.with_cutover(*cutover);
                }

                let inputs = load_inputs(
                    deployments,
                    costs,
                    coverage.as_deref().map(|path| (path, *coverage_merge)),
                    e2e.as_deref().map(|path| (path, *e2e_merge)),
                    monthly,
                )?;

                let origin = if *baseline_from_data {
                    BaselineOrigin::PreCutoverData
                } else {
                    BaselineOrigin::Configured
                };

                let report = analyze(&inputs, estimator_config, origin, Utc::now())?;

                if let Some(table_path) = table {
                    let file = File::create(table_path).with_context(|| {
                        format!("Failed to create table file {}", table_path.display())
                    })?;
                    write_monthly_table(&report.months, file)?;
                    info!("Monthly table written to: {}", table_path.display());
                }

                self.emit(&report)
            }
            Commands::Config => self.emit(&EstimatorConfig::reference()),
        }
    }

    fn emit<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}

fn load_inputs(
    deployments: &Path,
    costs: &Path,
    coverage: Option<(&Path, MergeRule)>,
    e2e: Option<(&Path, MergeRule)>,
    monthly: &[MonthlySpec],
) -> Result<AnalysisInputs> {
    let deployments = load_deployments(deployments, &DeploymentColumns::default())?;

    // Latest sample in the month is the authoritative cost.
    let infra_costs = MonthlySeries::from_samples(
        "infra_cost_usd",
        &load_samples(costs, &SampleColumns::infra_cost())?,
        MergeRule::Last,
    );

    let mut auxiliary = Vec::new();
    if let Some((path, rule)) = coverage {
        let samples = load_samples(path, &SampleColumns::coverage())?;
        auxiliary.push(MonthlySeries::from_samples("coverage_pct", &samples, rule));
    }
    if let Some((path, rule)) = e2e {
        let samples = load_samples(path, &SampleColumns::e2e_tests())?;
        auxiliary.push(MonthlySeries::from_samples("e2e_tests", &samples, rule));
    }
    for spec in monthly {
        let values = load_monthly_values(&spec.path, &spec.column)?;
        info!(
            "Loaded {} monthly values for '{}' from {}",
            values.len(),
            spec.name,
            spec.path.display()
        );
        auxiliary.push(MonthlySeries::from_monthly(&spec.name, values));
    }

    Ok(AnalysisInputs {
        deployments,
        infra_costs,
        auxiliary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::month::MonthKey;

    #[test]
    fn test_parse_monthly_spec_with_column() {
        let spec = parse_monthly_spec("feature_envs:count=data/envs.csv").unwrap();
        assert_eq!(spec.name, "feature_envs");
        assert_eq!(spec.column, "count");
        assert_eq!(spec.path, PathBuf::from("data/envs.csv"));
    }

    #[test]
    fn test_parse_monthly_spec_default_column() {
        let spec = parse_monthly_spec("pipeline_failure_rate=rates.csv").unwrap();
        assert_eq!(spec.column, "value");
    }

    #[test]
    fn test_parse_monthly_spec_rejects_malformed() {
        assert!(parse_monthly_spec("no-separator").is_err());
        assert!(parse_monthly_spec("=path.csv").is_err());
        assert!(parse_monthly_spec("name:=path.csv").is_err());
        assert!(parse_monthly_spec("name=").is_err());
    }

    #[test]
    fn test_parse_cutover() {
        let ts = parse_cutover("2023-12-12T14:13:04.057Z").unwrap();
        assert_eq!(ts, EstimatorConfig::reference().cutover);
        assert!(parse_cutover("december").is_err());
    }

    #[test]
    fn test_cli_requires_deployments_for_analyze() {
        let result = Cli::try_parse_from(["deploylens", "analyze", "--costs", "c.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_analyze_arguments() {
        let cli = Cli::try_parse_from([
            "deploylens",
            "--pretty",
            "analyze",
            "-d",
            "deploys.csv",
            "-c",
            "ec2.csv",
            "--reference-config",
            "--monthly",
            "feature_envs:count=envs.csv",
            "--cutover",
            "2024-01-01",
        ])
        .unwrap();

        assert!(cli.pretty);
        match cli.command {
            Commands::Analyze {
                reference_config,
                monthly,
                cutover,
                ..
            } => {
                assert!(reference_config);
                assert_eq!(monthly.len(), 1);
                assert_eq!(cutover.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
            }
            Commands::Config => panic!("expected analyze"),
        }
    }

    fn write_fixture(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "deploylens-{}-{name}",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_inputs_infra_cost_is_last_wins_regardless_of_aux_rules() {
        let deployments = write_fixture(
            "merge-deployments.csv",
            "branch_creation_datetime,deploy_prod_job_end_datetime,days_elapsed_branch_to_deploy,deploy_prod_job_trigger\n\
             2024-01-02T09:00:00Z,2024-01-03T09:00:00Z,1,auto\n",
        );
        let costs = write_fixture(
            "merge-costs.csv",
            "commit_date,ec2_cost_usd\n2024-01-05,100\n2024-01-20,130\n",
        );
        let coverage = write_fixture(
            "merge-coverage.csv",
            "commit_date,code_coverage\n2024-01-05,40\n2024-01-20,2\n",
        );

        let inputs = load_inputs(
            &deployments,
            &costs,
            Some((coverage.as_path(), MergeRule::Sum)),
            None,
            &[],
        )
        .unwrap();

        let january = MonthKey::new(2024, 1).unwrap();
        assert_eq!(inputs.infra_costs.get(january), Some(130.0));
        assert_eq!(inputs.auxiliary[0].get(january), Some(42.0));
        assert_eq!(inputs.deployments.len(), 1);
    }

    #[test]
    fn test_cli_per_series_merge_flags() {
        let cli = Cli::try_parse_from([
            "deploylens",
            "analyze",
            "-d",
            "deploys.csv",
            "-c",
            "ec2.csv",
            "--reference-config",
            "--coverage-merge",
            "first",
            "--e2e-merge",
            "sum",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                coverage_merge,
                e2e_merge,
                ..
            } => {
                assert_eq!(coverage_merge, MergeRule::First);
                assert_eq!(e2e_merge, MergeRule::Sum);
            }
            Commands::Config => panic!("expected analyze"),
        }

        assert!(Cli::try_parse_from([
            "deploylens",
            "analyze",
            "-d",
            "deploys.csv",
            "-c",
            "ec2.csv",
            "--merge-rule",
            "sum",
        ])
        .is_err());
    }

    #[test]
    fn test_reference_config_conflicts_with_config_file() {
        let result = Cli::try_parse_from([
            "deploylens",
            "analyze",
            "-d",
            "deploys.csv",
            "-c",
            "ec2.csv",
            "--config",
            "/nonexistent-config.json",
            "--reference-config",
        ]);

        match result {
            Err(err) => assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict),
            Ok(_) => panic!("expected a conflict between --config and --reference-config"),
        }
    }

    #[test]
    fn test_analyze_without_config_fails_loud() {
        let cli = Cli::try_parse_from([
            "deploylens",
            "analyze",
            "-d",
            "/nonexistent/deploys.csv",
            "-c",
            "/nonexistent/ec2.csv",
        ])
        .unwrap();

        let err = cli.execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployLensError>(),
            Some(DeployLensError::ConfigError(_))
        ));
    }
}
