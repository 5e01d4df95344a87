//! One consistency run, end to end.
//!
//! ```text
//! preflight ─► compile rules ─► load model ─► checks ─► regenerate CSVs
//!                                                     └► report ─► summary diff
//! ```
//!
//! Everything is synchronous; a fatal input error aborts before any output
//! is written.

use crate::checks::{run_all, CheckReport};
use crate::config::{CompiledRules, ConfigError, MptConfig, PathsConfig};
use crate::fews::LoadError;
use crate::model::MptModel;
use crate::regenerate::{regenerate, write_all, RegenerateError};
use crate::report::{
    compare_summary, load_expected_summary, read_toc, write_report, ReportError, Summary,
    SummaryDiff,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Missing inputs: {}", format_missing(.0))]
    MissingInputs(Vec<(String, PathBuf)>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Regenerate(#[from] RegenerateError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

fn format_missing(missing: &[(String, PathBuf)]) -> String {
    missing
        .iter()
        .map(|(role, path)| format!("{role} ({})", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Reference date for "still active" end dates
    pub today: NaiveDate,
    /// Write `consistency_output.xlsx`
    pub write_report: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            today: chrono::Local::now().date_naive(),
            write_report: true,
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: CheckReport,
    pub summary: Summary,
    /// Present when an expected summary was configured
    pub diff: Option<SummaryDiff>,
    pub csv_files: Vec<PathBuf>,
    pub workbook: Option<PathBuf>,
}

impl RunOutcome {
    pub fn deviates(&self) -> bool {
        self.diff.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// Check every configured input at once and report all missing paths.
pub fn preflight(paths: &PathsConfig) -> Result<(), RunError> {
    let mut missing: Vec<(String, PathBuf)> = paths
        .inputs()
        .into_iter()
        .filter(|(_, path, is_dir)| if *is_dir { !path.is_dir() } else { !path.is_file() })
        .map(|(role, path, _)| (role.to_string(), path.to_path_buf()))
        .collect();
    if let Some(expected) = &paths.expected_summary {
        if !expected.is_file() {
            missing.push(("expected_summary".to_string(), expected.clone()));
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        for (role, path) in &missing {
            warn!(input = %role, path = %path.display(), "Input not found");
        }
        Err(RunError::MissingInputs(missing))
    }
}

pub fn run(config: &MptConfig, options: &RunOptions) -> Result<RunOutcome, RunError> {
    let paths = &config.paths;
    preflight(paths)?;

    let rules = CompiledRules::compile(config).map_err(ConfigError::Validation)?;
    let model = MptModel::load(config, rules)?;
    let toc = read_toc(&paths.consistency_input_xlsx, &config.report.toc_sheet)?;
    let expected = paths
        .expected_summary
        .as_deref()
        .map(load_expected_summary)
        .transpose()?;
    let report = run_all(&model, options.today);

    // nothing is written until every input has been read
    let tables = regenerate(&model, report.new_hoofd.as_ref());
    let csv_files = write_all(&paths.output_dir, &tables)?;

    let descriptions = toc.as_ref().map(|t| t.descriptions()).unwrap_or_default();
    let summary = Summary::build(&report, model.mpt().len(), &descriptions);

    let workbook = if options.write_report {
        let path = paths.output_dir.join(&config.report.output_file);
        write_report(&path, &model, &report, toc.as_ref(), &summary)?;
        Some(path)
    } else {
        info!("Report skipped");
        None
    };

    let diff = expected.map(|expected| {
        let diff = compare_summary(&expected, &summary.counts());
        diff.log();
        diff
    });

    info!(
        findings = report.total(),
        csv_files = csv_files.len(),
        "Consistency run complete"
    );
    Ok(RunOutcome {
        report,
        summary,
        diff,
        csv_files,
        workbook,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_reports_every_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = PathsConfig {
            fews_config: dir.path().to_path_buf(),
            histtags_csv: dir.path().join("histtags.csv"),
            consistency_input_xlsx: dir.path().join("input.xlsx"),
            output_dir: dir.path().join("out"),
            ignored_histtag: dir.path().join("a.csv"),
            ignored_exloc: dir.path().join("b.csv"),
            ignored_ts800: dir.path().join("c.csv"),
            ignored_xy: dir.path().join("d.csv"),
            expected_summary: None,
        };
        for file in ["histtags.csv", "input.xlsx", "a.csv", "b.csv", "c.csv"] {
            std::fs::write(dir.path().join(file), "x").unwrap();
        }
        let Err(RunError::MissingInputs(missing)) = preflight(&paths) else {
            panic!("expected missing inputs");
        };
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].0, "ignored_xy");

        std::fs::write(dir.path().join("d.csv"), "x").unwrap();
        assert!(preflight(&paths).is_ok());

        // a file where a directory is expected
        paths.fews_config = dir.path().join("a.csv");
        paths.expected_summary = Some(dir.path().join("expected.json"));
        let Err(RunError::MissingInputs(missing)) = preflight(&paths) else {
            panic!("expected missing inputs");
        };
        let roles: Vec<&str> = missing.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(roles, vec!["fews_config", "expected_summary"]);
    }
}
