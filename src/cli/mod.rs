//! Airbnb EDA CLI Module
//!
//! Command-line interface for running the cleaning pipeline and inspecting
//! its output.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::analysis::{self, ModelSummary, SuperhostModel};
use crate::config::PipelineConfig;
use crate::preprocessing::ListingPipeline;
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "airbnb-eda")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean and explore Inside Airbnb listings snapshots")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, clean and persist a listings snapshot
    Run {
        /// JSON config file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listings source (URL or local path, optionally gzipped)
        #[arg(short, long)]
        source: Option<String>,

        /// Directory receiving every artifact
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Snapshot date used in artifact names (YYYY-MM-DD)
        #[arg(long)]
        snapshot_date: Option<NaiveDate>,

        /// City label used in artifact names
        #[arg(long)]
        city: Option<String>,

        /// Exclusive upper bound on nightly price
        #[arg(long)]
        price_ceiling: Option<i64>,

        /// Skip writing the uncompressed raw copy
        #[arg(long)]
        no_raw_copy: bool,
    },

    /// Summarize a persisted dataset
    Describe {
        /// Parquet or CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Fit the superhost logistic model on the analysis dataset
    Model {
        /// Analysis dataset (Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

/// Overrides collected from `run` flags
#[derive(Debug, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub source: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub snapshot_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub price_ceiling: Option<i64>,
    pub no_raw_copy: bool,
}

impl RunArgs {
    /// Merge flags over the config file (or defaults)
    pub fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(source) = self.source {
            config = config.with_source(source);
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(date) = self.snapshot_date {
            config = config.with_snapshot_date(date);
        }
        if let Some(city) = self.city {
            config = config.with_city(city);
        }
        if let Some(ceiling) = self.price_ceiling {
            config = config.with_price_ceiling(ceiling);
        }
        if self.no_raw_copy {
            config = config.without_raw_copy();
        }
        config.validate()?;
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    section("Run");

    let config = args.into_config()?;
    println!("  {:<16} {}", muted("Source"), config.source_url.white());
    println!("  {:<16} {}", muted("Output"), config.output_dir.display().to_string().white());

    step_run("Running pipeline");
    let start = Instant::now();
    let outcome = ListingPipeline::new(config).run()?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("  {:<28} {:>10} {:>10}", muted("Stage"), muted("Rows in"), muted("Rows out"));
    println!("  {}", dim(&"─".repeat(50)));
    for stage in &outcome.report.stages {
        println!("  {:<28} {:>10} {:>10}", stage.stage.as_str(), stage.rows_in, stage.rows_out);
    }
    println!("  {}", dim(&"─".repeat(50)));

    let price = &outcome.report.price;
    println!();
    println!("  {:<16} {}", muted("Unparseable"), price.parse_failures.to_string().white());
    println!(
        "  {:<16} {}",
        muted("Outliers"),
        format!("{} at or above {}", price.outliers_dropped, price.ceiling).white()
    );

    println!();
    let artifacts = &outcome.report.artifacts;
    let written = artifacts
        .raw_copy
        .iter()
        .chain([&artifacts.select_variables, &artifacts.analysis_dataset, &artifacts.report]);
    for path in written {
        println!("  {} {}", ok("✓"), path.display());
    }

    match SuperhostModel::new().fit_frame(&outcome.cleaning.table) {
        Ok(summary) => print_model_summary(&summary),
        Err(e) => {
            println!();
            println!("  {}", format!("Model skipped: {}", e).yellow());
        }
    }
    println!();
    Ok(())
}

pub fn cmd_describe(data_path: &Path, json: bool) -> anyhow::Result<()> {
    let df = DataLoader::new().load_auto(data_path)?;
    let summaries = analysis::describe(&df)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    section("Describe");
    println!("  {:<16} {}", muted("Rows"), df.height().to_string().white());
    println!("  {:<16} {}", muted("Columns"), df.width().to_string().white());
    println!();

    println!(
        "  {:<28} {:>7} {:>6} {:>10} {:>10} {:>10}",
        muted("Column"), muted("Count"), muted("Nulls"), muted("Mean"), muted("Min"), muted("Max")
    );
    println!("  {}", dim(&"─".repeat(76)));
    for s in &summaries {
        println!(
            "  {:<28} {:>7} {:>6} {:>10} {:>10} {:>10}",
            s.name,
            s.count,
            s.null_count,
            fmt_opt(s.mean),
            fmt_opt(s.min),
            fmt_opt(s.max)
        );
        if let Some(top) = &s.top {
            let labels: Vec<String> = top.iter().map(|(label, n)| format!("{label} ({n})")).collect();
            println!("    {}", dim(&labels.join(", ")));
        }
    }

    if let Ok(breakdown) = analysis::superhost_by_response_time(&df) {
        section("Superhost share by response time");
        for row in &breakdown {
            println!(
                "  {:<24} {:>6} listings  {:>6.1}% superhost  rating {}",
                row.response_time,
                row.listings,
                row.superhost_share * 100.0,
                fmt_opt(row.mean_rating)
            );
        }
    }
    println!();
    Ok(())
}

pub fn cmd_model(data_path: &Path, json: bool) -> anyhow::Result<()> {
    let df = DataLoader::new().load_auto(data_path)?;

    let start = Instant::now();
    let summary = SuperhostModel::new().fit_frame(&df)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_model_summary(&summary);
    println!(
        "  {:<16} {}",
        muted("Elapsed"),
        format!("{:?}", start.elapsed()).white()
    );
    println!();
    Ok(())
}

fn print_model_summary(summary: &ModelSummary) {
    section("Logit: host_is_superhost_binary");
    println!(
        "  {:<44} {:>9} {:>8} {:>8} {:>7}",
        muted("Term"), muted("Coef"), muted("SE"), muted("z"), muted("P>|z|")
    );
    println!("  {}", dim(&"─".repeat(80)));
    for c in &summary.coefficients {
        println!(
            "  {:<44} {:>9.4} {:>8.4} {:>8.3} {:>7.3}",
            c.name, c.estimate, c.std_error, c.z, c.p_value
        );
    }
    println!("  {}", dim(&"─".repeat(80)));
    println!();
    println!("  {:<16} {}", muted("Reference"), summary.reference_category.white());
    println!("  {:<16} {}", muted("Observations"), summary.n_obs.to_string().white());
    println!("  {:<16} {}", muted("Log-lik"), format!("{:.3}", summary.log_likelihood).white());
    println!("  {:<16} {}", muted("Pseudo R²"), format!("{:.4}", summary.pseudo_r2).white().bold());
    println!(
        "  {:<16} {}",
        muted("Converged"),
        format!("{} after {} iterations", summary.converged, summary.iterations).white()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_override_defaults() {
        let args = RunArgs {
            source: Some("listings.csv.gz".to_string()),
            city: Some("lisbon".to_string()),
            price_ceiling: Some(500),
            no_raw_copy: true,
            ..Default::default()
        };
        let config = args.into_config().unwrap();

        assert_eq!(config.source_url, "listings.csv.gz");
        assert_eq!(config.city_label, "lisbon");
        assert_eq!(config.price_ceiling, 500);
        assert!(config.raw_copy_name.is_none());
    }

    #[test]
    fn test_run_rejects_invalid_ceiling() {
        let args = RunArgs {
            price_ceiling: Some(0),
            ..Default::default()
        };
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["airbnb-eda", "run", "--city", "paris", "--snapshot-date", "2024-03-01"]).unwrap();
        match cli.command {
            Commands::Run { city, snapshot_date, .. } => {
                assert_eq!(city.as_deref(), Some("paris"));
                assert_eq!(snapshot_date, NaiveDate::from_ymd_opt(2024, 3, 1));
            }
            _ => panic!("expected run"),
        }
    }
}
