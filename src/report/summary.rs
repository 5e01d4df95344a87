//! Summary sheet rows and the expected-summary comparison.
//!
//! The expected summary is a JSON object `{sheet: count}`. Deviations are
//! reported as added, removed and modified keys so a regression run shows
//! exactly which checks moved.

use super::ReportError;
use crate::checks::{describe, CheckReport, MPT_SHEET};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// One line of the `samenvatting` sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub sheet: String,
    pub count: usize,
    pub description: String,
    /// Informational sheets are never coloured as failing
    pub informational: bool,
}

impl SummaryRow {
    pub fn is_failing(&self) -> bool {
        !self.informational && self.count > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    /// One row per check in run order, then the `mpt` sheet. Descriptions
    /// come from the input workbook where present.
    pub fn build(
        report: &CheckReport,
        mpt_rows: usize,
        descriptions: &BTreeMap<String, String>,
    ) -> Self {
        let description = |sheet: &str| {
            descriptions
                .get(sheet)
                .filter(|d| !d.is_empty())
                .cloned()
                .unwrap_or_else(|| describe(sheet).to_string())
        };

        let mut rows: Vec<SummaryRow> = report
            .results
            .iter()
            .map(|r| SummaryRow {
                sheet: r.sheet.to_string(),
                count: r.count(),
                description: description(r.sheet),
                informational: false,
            })
            .collect();
        rows.push(SummaryRow {
            sheet: MPT_SHEET.to_string(),
            count: mpt_rows,
            description: description(MPT_SHEET),
            informational: true,
        });
        Self { rows }
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.rows
            .iter()
            .map(|r| (r.sheet.clone(), r.count))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.counts())
    }
}

/// Changed keys between an expected and an actual summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryDiff {
    /// In the actual summary only
    pub added: Vec<String>,
    /// In the expected summary only
    pub removed: Vec<String>,
    /// `(sheet, expected, actual)`
    pub modified: Vec<(String, usize, usize)>,
}

impl SummaryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn log(&self) {
        if self.is_empty() {
            info!("Summary matches the expected summary");
            return;
        }
        for sheet in &self.added {
            warn!(sheet = %sheet, "Sheet not in expected summary");
        }
        for sheet in &self.removed {
            warn!(sheet = %sheet, "Expected sheet missing from summary");
        }
        for (sheet, expected, actual) in &self.modified {
            warn!(sheet = %sheet, expected, actual, "Summary count differs");
        }
    }
}

pub fn compare_summary(
    expected: &BTreeMap<String, usize>,
    actual: &BTreeMap<String, usize>,
) -> SummaryDiff {
    let mut diff = SummaryDiff::default();
    for (sheet, count) in actual {
        match expected.get(sheet) {
            None => diff.added.push(sheet.clone()),
            Some(e) if e != count => diff.modified.push((sheet.clone(), *e, *count)),
            Some(_) => {}
        }
    }
    diff.removed = expected
        .keys()
        .filter(|k| !actual.contains_key(*k))
        .cloned()
        .collect();
    diff
}

pub fn load_expected_summary(path: &Path) -> Result<BTreeMap<String, usize>, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReportError::SummaryIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ReportError::SummaryJson {
        path: path.to_path_buf(),
        source,
    })
}
