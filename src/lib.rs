//! MPT Config: consistency checks for a FEWS monitoring-point configuration
//!
//! Reads the location sets, id-maps and parameters of a FEWS configuration
//! together with a hist-tag inventory, checks them against each other and
//! writes a findings workbook plus regenerated location CSVs.
//!
//! ## Architecture
//!
//! - **Config**: run configuration and the pattern tables behind the checks
//! - **FEWS**: XML and CSV readers for the configuration tree
//! - **Model**: the fused, read-only view every check works on
//! - **Checks**: thirteen consistency predicates, one findings table each
//! - **Regenerate**: rewritten hoofd, sub and waterstand CSVs
//! - **Report**: output workbook and the expected-summary comparison

pub mod checks;
pub mod config;
pub mod fews;
pub mod model;
pub mod pipeline;
pub mod regenerate;
pub mod report;
pub mod types;

pub use checks::{run_all, CheckReport, CheckResult};
pub use config::{CompiledRules, ConfigError, MptConfig};
pub use fews::{FewsConfig, LoadError, LocationSet};
pub use model::MptModel;
pub use pipeline::{run, RunError, RunOptions, RunOutcome};
pub use report::{ReportError, Summary, SummaryDiff};
pub use types::Table;
