use std::io::Write;

use csv::Writer;

use crate::error::Result;
use crate::insights::MonthlyReportRow;

const SUMMARY_COLUMNS: [&str; 11] = [
    "month",
    "total_count",
    "completed_count",
    "deployed_count",
    "completion_rate",
    "mean_elapsed_days",
    "median_elapsed_days",
    "p90_elapsed_days",
    "auto_trigger_pct",
    "is_post_cutover",
    "straddles_cutover",
];

const SAVINGS_COLUMNS: [&str; 7] = [
    "time_savings",
    "failure_savings",
    "testing_savings",
    "opportunity_savings",
    "total_savings",
    "infra_cost",
    "net_savings",
];

/// Write one CSV row per month. Auxiliary series follow the fixed columns;
/// a month without data for a series gets an empty cell.
pub fn write_monthly_table<W: Write>(rows: &[MonthlyReportRow], writer: W) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);

    let series_names: Vec<&str> = rows
        .first()
        .map(|row| row.series.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let header = SUMMARY_COLUMNS
        .iter()
        .chain(SAVINGS_COLUMNS.iter())
        .copied()
        .chain(series_names.iter().copied());
    csv_writer.write_record(header)?;

    for row in rows {
        csv_writer.write_record(table_record(row, &series_names))?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn table_record(row: &MonthlyReportRow, series_names: &[&str]) -> Vec<String> {
    let s = &row.summary;
    let b = &row.savings;

    let mut record = vec![
        row.month.to_string(),
        s.total_count.to_string(),
        s.completed_count.to_string(),
        s.deployed_count.to_string(),
        format!("{:.4}", s.completion_rate),
        format!("{:.2}", s.mean_elapsed_days),
        format!("{:.2}", s.median_elapsed_days),
        format!("{:.2}", s.p90_elapsed_days),
        format!("{:.1}", s.auto_trigger_pct),
        s.is_post_cutover.to_string(),
        s.straddles_cutover.to_string(),
    ];

    record.extend(
        [
            b.time_savings,
            b.failure_savings,
            b.testing_savings,
            b.opportunity_savings,
            b.total_savings,
            b.infra_cost,
            b.net_savings,
        ]
        .iter()
        .map(|v| format!("{v:.2}")),
    );

    record.extend(series_names.iter().map(|name| {
        row.series
            .get(*name)
            .copied()
            .flatten()
            .map(|v| v.to_string())
            .unwrap_or_default()
    }));

    record
}
