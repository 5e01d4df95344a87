//! mpt-consistency: FEWS MPT configuration consistency checker
//!
//! # Usage
//!
//! ```bash
//! # Run with ./mpt_config.toml or the built-in defaults
//! mpt-consistency
//!
//! # Regression run against a known summary
//! mpt-consistency --expected-summary tests/fixtures/expected_summary.json --strict
//! ```
//!
//! # Environment Variables
//!
//! - `MPT_CONFIG`: Path to the TOML run configuration
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use mpt_consistency::config::{MptConfig, CONFIG_ENV_VAR};
use mpt_consistency::pipeline::{self, RunOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

/// Exit code when the summary deviates from the expected one under `--strict`.
const EXIT_SUMMARY_DEVIATION: u8 = 2;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "mpt-consistency")]
#[command(about = "Consistency checker for FEWS monitoring-point configurations")]
#[command(version)]
struct CliArgs {
    /// TOML run configuration (default: ./mpt_config.toml, then built-in defaults)
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Root of the FEWS configuration
    #[arg(long, value_name = "DIR")]
    fews_config: Option<PathBuf>,

    /// Hist-tag inventory CSV
    #[arg(long, value_name = "FILE")]
    histtags: Option<PathBuf>,

    /// Destination of the workbook and the regenerated CSVs
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// JSON {sheet: count} to compare the summary against
    #[arg(long, value_name = "FILE")]
    expected_summary: Option<PathBuf>,

    /// Exit with code 2 when the summary deviates from the expected summary
    #[arg(long)]
    strict: bool,

    /// Skip the output workbook; CSVs are still regenerated
    #[arg(long)]
    no_report: bool,
}

fn load_config(args: &CliArgs) -> Result<MptConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let config = MptConfig::load_from_file(path)
                .with_context(|| format!("Failed to load run config {}", path.display()))?;
            info!(path = %path.display(), "Loaded run config");
            config
        }
        None => MptConfig::load(),
    };

    let paths = &mut config.paths;
    if let Some(dir) = &args.fews_config {
        paths.fews_config.clone_from(dir);
    }
    if let Some(file) = &args.histtags {
        paths.histtags_csv.clone_from(file);
    }
    if let Some(dir) = &args.output_dir {
        paths.output_dir.clone_from(dir);
    }
    if args.expected_summary.is_some() {
        paths.expected_summary.clone_from(&args.expected_summary);
    }
    Ok(config)
}

fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let options = RunOptions {
        write_report: !args.no_report,
        ..RunOptions::default()
    };

    let outcome = pipeline::run(&config, &options).context("Consistency run failed")?;

    for row in outcome.summary.rows.iter().filter(|r| r.is_failing()) {
        info!(check = %row.sheet, findings = row.count, "{}", row.description);
    }
    if let Some(path) = &outcome.workbook {
        info!(path = %path.display(), "Workbook ready");
    }

    if args.strict && outcome.deviates() {
        warn!("Summary deviates from the expected summary");
        return Ok(ExitCode::from(EXIT_SUMMARY_DEVIATION));
    }
    Ok(ExitCode::SUCCESS)
}
