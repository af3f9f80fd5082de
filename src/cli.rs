use crate::aggregate::AggregateBucket;
use crate::config::ReportConfig;
use crate::output::{preview_report, write_report};
use crate::period::ReportPeriod;
use crate::pipeline::{report_from_totals, run_all, ClientOutcome, RunOptions};
use crate::types::{MetricRow, Micros};
use anyhow::{bail, Context};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Weekly ads performance reports with rule-based insights
#[derive(Parser)]
#[command(name = "ads-report")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build reports from a CSV export or API JSON dump
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Current-period export (.csv or .json)
        #[arg(long)]
        current: PathBuf,

        /// Previous-period export; without it the current file is split by date
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Client slug to report on (repeatable, default all)
        #[arg(long = "client")]
        clients: Vec<String>,

        /// Build and preview without writing files
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build one report from period totals entered by hand
    Manual {
        #[command(flatten)]
        common: CommonArgs,

        /// Client slug
        #[arg(long)]
        client: String,

        #[command(flatten)]
        current: TotalsArgs,

        #[command(flatten)]
        previous: PreviousTotalsArgs,

        /// Print the view model as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured clients
    Clients {
        /// Client catalogue and thresholds
        #[arg(long, default_value = "clients.json")]
        config: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Client catalogue and thresholds
    #[arg(long, default_value = "clients.json")]
    config: PathBuf,

    /// Last day of the report period (default: most recent Sunday)
    #[arg(long)]
    period_end: Option<NaiveDate>,

    /// Period length in days (overrides config)
    #[arg(long)]
    days: Option<u32>,

    /// Output directory for report folders
    #[arg(long, default_value = "reports")]
    out_dir: PathBuf,

    /// Changes smaller than this many percent are shown as flat (overrides config)
    #[arg(long)]
    flat_threshold: Option<f64>,
}

#[derive(Args, Debug, Clone, Default)]
struct TotalsArgs {
    #[arg(long, default_value_t = 0.0)]
    spend: f64,
    #[arg(long, default_value_t = 0)]
    impressions: u64,
    #[arg(long, default_value_t = 0)]
    clicks: u64,
    #[arg(long, default_value_t = 0.0)]
    conversions: f64,
}

#[derive(Args, Debug, Clone, Default)]
struct PreviousTotalsArgs {
    #[arg(long, default_value_t = 0.0)]
    prev_spend: f64,
    #[arg(long, default_value_t = 0)]
    prev_impressions: u64,
    #[arg(long, default_value_t = 0)]
    prev_clicks: u64,
    #[arg(long, default_value_t = 0.0)]
    prev_conversions: f64,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let today = Local::now().date_naive();
        match self.command {
            Commands::Run {
                common,
                current,
                previous,
                clients,
                dry_run,
                json,
            } => {
                let config = load_config(&common)?;
                let opts = RunOptions {
                    current,
                    previous,
                    period: resolve_period(common.period_end, config.period_days, today)?,
                    out_dir: (!dry_run).then(|| common.out_dir.clone()),
                    generated_on: today,
                };
                info!(period = %opts.period.label(), "starting run");
                let summary = run_all(&config, &clients, &opts)?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    for outcome in &summary.results {
                        match outcome {
                            ClientOutcome::Success { report, .. } => preview_report(&report.view, 5),
                            ClientOutcome::Failed { client, error } => {
                                eprintln!("{}: {}", client, error)
                            }
                        }
                    }
                    println!(
                        "\n{} succeeded, {} failed ({} rows rejected)",
                        summary.succeeded,
                        summary.failed,
                        summary.load.rejected_rows()
                    );
                }
                if summary.failed > 0 {
                    bail!("{} client report(s) failed", summary.failed);
                }
                Ok(())
            }
            Commands::Manual {
                common,
                client,
                current,
                previous,
                json,
            } => {
                let config = load_config(&common)?;
                let client = config.client(&client)?;
                let period = resolve_period(common.period_end, config.period_days, today)?;
                let view = report_from_totals(
                    &config,
                    client,
                    period,
                    today,
                    totals(current.impressions, current.clicks, current.spend, current.conversions),
                    totals(
                        previous.prev_impressions,
                        previous.prev_clicks,
                        previous.prev_spend,
                        previous.prev_conversions,
                    ),
                )?;
                let dir = common
                    .out_dir
                    .join(format!("{}-{}", client.slug, period.folder_name()));
                let written = write_report(&dir, &view)
                    .with_context(|| format!("failed to write {}", dir.display()))?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    preview_report(&view, 0);
                    println!("\nSaved: {}", written.report.display());
                }
                Ok(())
            }
            Commands::Clients { config, json } => {
                let config = read_config(&config)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&config.clients)?);
                } else if config.clients.is_empty() {
                    println!("No clients configured.");
                } else {
                    for c in &config.clients {
                        println!(
                            "{:<16} {:<32} {:<14} {}",
                            c.slug,
                            c.name,
                            c.customer_id,
                            c.recipients().join(", ")
                        );
                    }
                }
                Ok(())
            }
        }
    }
}

fn read_config(path: &Path) -> anyhow::Result<ReportConfig> {
    ReportConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}

/// Config file plus command-line overrides, validated again after overriding.
fn load_config(common: &CommonArgs) -> anyhow::Result<ReportConfig> {
    let mut config = read_config(&common.config)?;
    if let Some(flat) = common.flat_threshold {
        config.thresholds.flat_pct = flat;
    }
    if let Some(days) = common.days {
        config.period_days = days;
    }
    config.validate()?;
    Ok(config)
}

/// The explicit end date if given; otherwise the last full week for weekly
/// periods, or the `days` ending yesterday.
fn resolve_period(
    period_end: Option<NaiveDate>,
    days: u32,
    today: NaiveDate,
) -> anyhow::Result<ReportPeriod> {
    let period = match period_end {
        Some(end) => ReportPeriod::ending(end, days)?,
        None if days == 7 => ReportPeriod::last_full_week(today)?,
        None => {
            let yesterday = today
                .checked_sub_days(Days::new(1))
                .context("no day before today")?;
            ReportPeriod::ending(yesterday, days)?
        }
    };
    Ok(period)
}

fn totals(impressions: u64, clicks: u64, spend: f64, conversions: f64) -> AggregateBucket {
    let mut bucket = AggregateBucket::default();
    let mut row = MetricRow::new("manual").with_counts(impressions, clicks, spend, conversions);
    row.all_conversions = Micros::from_units(conversions);
    bucket.add(&row);
    bucket
}
