// Per-client orchestration: load, filter, aggregate, verify, compare,
// classify, build the view model and write outputs.
//
// A failing client is recorded as `ClientOutcome::Failed` and the
// remaining clients still run.

use crate::aggregate::{AggregateBucket, Aggregator, PeriodSummary};
use crate::config::{ClientConfig, ReportConfig};
use crate::error::{ReportError, Result};
use crate::insights::InsightEngine;
use crate::loader::{load_path, rows_for_client, LoadReport};
use crate::output::{write_json, write_report, WrittenReport};
use crate::period::ReportPeriod;
use crate::reports::{ViewModel, ViewModelBuilder};
use crate::types::MetricRow;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub current: PathBuf,
    /// Without a previous-period file, `current` is split by date.
    pub previous: Option<PathBuf>,
    pub period: ReportPeriod,
    /// Where report folders go; `None` builds reports without writing.
    pub out_dir: Option<PathBuf>,
    pub generated_on: NaiveDate,
}

/// Loaded rows for both periods
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub current: Vec<MetricRow>,
    pub previous: Vec<MetricRow>,
    pub load: LoadReport,
    pub out_of_period: usize,
}

#[derive(Debug, Clone)]
pub struct ClientReport {
    pub view: ViewModel,
    pub written: Option<WrittenReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClientOutcome {
    Success {
        client: String,
        report_id: String,
        output: Option<PathBuf>,
        recipients: Vec<String>,
        #[serde(skip)]
        report: Box<ClientReport>,
    },
    #[serde(rename = "error")]
    Failed { client: String, error: String },
}

impl ClientOutcome {
    pub fn client(&self) -> &str {
        match self {
            ClientOutcome::Success { client, .. } | ClientOutcome::Failed { client, .. } => client,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ClientOutcome::Success { .. })
    }

    pub fn report(&self) -> Option<&ClientReport> {
        match self {
            ClientOutcome::Success { report, .. } => Some(report.as_ref()),
            ClientOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_on: NaiveDate,
    pub period: ReportPeriod,
    pub period_label: String,
    pub load: LoadReport,
    pub out_of_period: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ClientOutcome>,
}

pub fn load_inputs(opts: &RunOptions) -> Result<Inputs> {
    let (rows, mut load) = load_path(&opts.current)?;
    let inputs = match &opts.previous {
        Some(previous_path) => {
            let (previous, previous_load) = load_path(previous_path)?;
            load.merge(previous_load);
            Inputs {
                current: rows,
                previous,
                load,
                out_of_period: 0,
            }
        }
        None => {
            let split = opts.period.split(rows);
            Inputs {
                current: split.current,
                previous: split.previous,
                load,
                out_of_period: split.out_of_period,
            }
        }
    };

    info!(
        total = inputs.load.total_rows,
        accepted = inputs.load.accepted_rows,
        excluded = inputs.load.excluded_rows,
        rejected = inputs.load.rejected_rows(),
        "inputs loaded"
    );
    if inputs.load.rejected_rows() > 0 {
        warn!(rejected = inputs.load.rejected_rows(), "malformed rows skipped");
    }
    if inputs.out_of_period > 0 {
        warn!(rows = inputs.out_of_period, "rows outside both periods ignored");
    }
    Ok(inputs)
}

/// Summaries to view model. Fails when bucket sums disagree with totals.
pub fn build_view(
    config: &ReportConfig,
    client: &ClientConfig,
    period: ReportPeriod,
    generated_on: NaiveDate,
    current: &PeriodSummary,
    previous: &PeriodSummary,
) -> Result<ViewModel> {
    current.verify_totals()?;
    previous.verify_totals()?;
    let analysis = InsightEngine::new(config.thresholds.clone()).analyze(current, previous);
    Ok(ViewModelBuilder::new(config, client, period)
        .generated_on(generated_on)
        .build(current, previous, &analysis))
}

/// View model from period totals alone, with no campaign or daily rows.
pub fn report_from_totals(
    config: &ReportConfig,
    client: &ClientConfig,
    period: ReportPeriod,
    generated_on: NaiveDate,
    current: AggregateBucket,
    previous: AggregateBucket,
) -> Result<ViewModel> {
    build_view(
        config,
        client,
        period,
        generated_on,
        &PeriodSummary::from_totals(current),
        &PeriodSummary::from_totals(previous),
    )
}

pub fn run_client(
    config: &ReportConfig,
    client: &ClientConfig,
    inputs: &Inputs,
    opts: &RunOptions,
) -> Result<ClientReport> {
    let current_rows = rows_for_client(&inputs.current, client);
    let previous_rows = rows_for_client(&inputs.previous, client);
    info!(
        client = %client.slug,
        current_rows = current_rows.len(),
        previous_rows = previous_rows.len(),
        "building report"
    );

    let current = Aggregator::campaign_and_daily(&current_rows);
    let previous = Aggregator::campaign_and_daily(&previous_rows);
    let view = build_view(config, client, opts.period, opts.generated_on, &current, &previous)?;
    if !view.has_data {
        warn!(client = %client.slug, "no activity in the current period");
    }

    let written = match &opts.out_dir {
        Some(out) => {
            let dir = out.join(format!("{}-{}", client.slug, opts.period.folder_name()));
            let written = write_report(&dir, &view)?;
            info!(client = %client.slug, path = %written.report.display(), "report written");
            Some(written)
        }
        None => None,
    };
    Ok(ClientReport { view, written })
}

/// Run every requested client (all configured ones when `slugs` is empty).
/// Only a failure to load the inputs aborts the run.
pub fn run_all(config: &ReportConfig, slugs: &[String], opts: &RunOptions) -> Result<RunSummary> {
    if config.clients.is_empty() {
        return Err(ReportError::Config("no clients configured".to_string()));
    }
    let inputs = load_inputs(opts)?;

    let requested: Vec<&str> = if slugs.is_empty() {
        config.clients.iter().map(|c| c.slug.as_str()).collect()
    } else {
        slugs.iter().map(String::as_str).collect()
    };

    let results: Vec<ClientOutcome> = requested
        .into_iter()
        .map(|slug| {
            let outcome = config.client(slug).and_then(|client| {
                let report = run_client(config, client, &inputs, opts)?;
                Ok((client.recipients(), report))
            });
            match outcome {
                Ok((recipients, report)) => ClientOutcome::Success {
                    client: slug.to_string(),
                    report_id: report.view.header.report_id.clone(),
                    output: report.written.as_ref().map(|w| w.dir.clone()),
                    recipients,
                    report: Box::new(report),
                },
                Err(e) => {
                    error!(client = %slug, error = %e, "client report failed");
                    ClientOutcome::Failed {
                        client: slug.to_string(),
                        error: e.to_string(),
                    }
                }
            }
        })
        .collect();

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let summary = RunSummary {
        generated_on: opts.generated_on,
        period: opts.period,
        period_label: opts.period.label(),
        load: inputs.load,
        out_of_period: inputs.out_of_period,
        succeeded,
        failed: results.len() - succeeded,
        results,
    };

    if let Some(out) = &opts.out_dir {
        std::fs::create_dir_all(out)?;
        write_json(&out.join(RUN_SUMMARY_FILE), &summary)?;
    }
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "run complete"
    );
    Ok(summary)
}
