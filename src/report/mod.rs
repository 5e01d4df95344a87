//! Report Writer
//!
//! Writes `consistency_output.xlsx`: the table of contents, the
//! `samenvatting` summary, the four ignore lists, one sheet per check and
//! the `mpt` sheet. Sheet descriptions come from the table of contents of
//! the input workbook; built-in descriptions fill the gaps.

mod summary;
mod workbook;

pub use summary::{compare_summary, load_expected_summary, Summary, SummaryDiff, SummaryRow};
pub use workbook::{read_toc, write_summary_sheet, write_table_sheet, Tab, Toc};

use crate::checks::{describe, CheckReport, MPT_SHEET};
use crate::model::MptModel;
use rust_xlsxwriter::{Workbook, XlsxError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const SUMMARY_SHEET: &str = "samenvatting";
pub const IGNORED_HISTTAG_SHEET: &str = "ignored_histTag";
pub const IGNORED_EXLOC_SHEET: &str = "ignored_exLoc";
pub const IGNORED_TS800_SHEET: &str = "ignored_ts800";
pub const IGNORED_XY_SHEET: &str = "ignored_xy";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot write workbook {}: {source}", .path.display())]
    Xlsx { path: PathBuf, source: XlsxError },

    #[error("Cannot read input workbook {}: {source}", .path.display())]
    InputWorkbook {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("Cannot read expected summary {}: {source}", .path.display())]
    SummaryIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid expected summary {}: {source}", .path.display())]
    SummaryJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn report_sheet_description(sheet: &str) -> &'static str {
    match sheet {
        IGNORED_HISTTAG_SHEET => "hist tags die bewust niet gekoppeld zijn",
        IGNORED_EXLOC_SHEET => "toegestane afwijkingen externe/interne locatie",
        IGNORED_TS800_SHEET => "8-locaties die niet bij de kunstwerkgroep horen",
        IGNORED_XY_SHEET => "toegestane coördinaten per interne locatie",
        SUMMARY_SHEET => "aantal bevindingen per controle",
        _ => "",
    }
}

/// Every sheet after the table of contents with its built-in description,
/// in workbook order.
pub fn sheet_order(report: &CheckReport) -> Vec<(String, String)> {
    let mut sheets: Vec<&str> = vec![
        SUMMARY_SHEET,
        IGNORED_HISTTAG_SHEET,
        IGNORED_EXLOC_SHEET,
        IGNORED_TS800_SHEET,
        IGNORED_XY_SHEET,
    ];
    sheets.extend(report.results.iter().map(|r| r.sheet));
    sheets.push(MPT_SHEET);
    sheets
        .into_iter()
        .map(|s| {
            let description = match describe(s) {
                "" => report_sheet_description(s),
                d => d,
            };
            (s.to_string(), description.to_string())
        })
        .collect()
}

/// Write the output workbook to `path`. Without `toc` a table of contents
/// is generated from the built-in descriptions.
pub fn write_report(
    path: &Path,
    model: &MptModel,
    report: &CheckReport,
    toc: Option<&Toc>,
    summary: &Summary,
) -> Result<(), ReportError> {
    let xlsx_error = |source| ReportError::Xlsx {
        path: path.to_path_buf(),
        source,
    };
    let settings = &model.config.report;
    let min_width = settings.min_column_width;
    let mut workbook = Workbook::new();

    let generated;
    let toc = match toc {
        Some(toc) => toc,
        None => {
            generated = Toc::generated(&sheet_order(report));
            &generated
        }
    };
    write_table_sheet(&mut workbook, &settings.toc_sheet, &toc.table, Tab::Plain, min_width)
        .map_err(xlsx_error)?;
    write_summary_sheet(&mut workbook, SUMMARY_SHEET, summary, min_width).map_err(xlsx_error)?;

    let ignore = &model.ignore;
    for (sheet, table) in [
        (IGNORED_HISTTAG_SHEET, &ignore.histtag),
        (IGNORED_EXLOC_SHEET, &ignore.exloc),
        (IGNORED_TS800_SHEET, &ignore.ts800),
        (IGNORED_XY_SHEET, &ignore.xy),
    ] {
        write_table_sheet(&mut workbook, sheet, table, Tab::Plain, min_width)
            .map_err(xlsx_error)?;
    }
    for result in &report.results {
        write_table_sheet(&mut workbook, result.sheet, &result.table, Tab::ByContent, min_width)
            .map_err(xlsx_error)?;
    }
    write_table_sheet(&mut workbook, MPT_SHEET, &model.mpt_sheet(), Tab::Green, min_width)
        .map_err(xlsx_error)?;

    workbook.save(path).map_err(xlsx_error)?;
    info!(
        path = %path.display(),
        sheets = report.results.len() + 7,
        findings = report.total(),
        "Report written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{run_all, CHECK_SHEETS, HLOC_ERROR};
    use crate::model::fixture::ModelBuilder;
    use calamine::{open_workbook_auto, Reader};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_sheet_order_and_generated_toc() {
        let model = ModelBuilder::happy().build();
        let report = run_all(&model, today());
        let summary = Summary::build(&report, model.mpt().len(), &BTreeMap::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_report(&path, &model, &report, None, &summary).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let names = workbook.sheet_names();
        assert_eq!(names.len(), 7 + CHECK_SHEETS.len());
        assert_eq!(names[0], "inhoudsopgave");
        assert_eq!(names[1], SUMMARY_SHEET);
        assert_eq!(names[2], IGNORED_HISTTAG_SHEET);
        assert_eq!(names[6], CHECK_SHEETS[0]);
        assert_eq!(names.last().map(String::as_str), Some(MPT_SHEET));

        let toc = read_toc(&path, "inhoudsopgave").unwrap().unwrap();
        let descriptions = toc.descriptions();
        assert_eq!(descriptions[HLOC_ERROR], describe(HLOC_ERROR));
        assert_eq!(descriptions.len(), names.len() - 1);
    }

    #[test]
    fn test_input_toc_is_copied_and_feeds_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("inhoudsopgave").unwrap();
        sheet.write_string(0, 0, "werkblad").unwrap();
        sheet.write_string(0, 1, "beschrijving").unwrap();
        sheet.write_string(1, 0, HLOC_ERROR).unwrap();
        sheet.write_string(1, 1, "eigen tekst").unwrap();
        workbook.save(&input).unwrap();

        let toc = read_toc(&input, "inhoudsopgave").unwrap().unwrap();
        let model = ModelBuilder::happy().build();
        let report = run_all(&model, today());
        let summary = Summary::build(&report, 0, &toc.descriptions());
        let hloc = summary.rows.iter().find(|r| r.sheet == HLOC_ERROR).unwrap();
        assert_eq!(hloc.description, "eigen tekst");

        let output = dir.path().join("output.xlsx");
        write_report(&output, &model, &report, Some(&toc), &summary).unwrap();
        let copied = read_toc(&output, "inhoudsopgave").unwrap().unwrap();
        assert_eq!(copied, toc);
    }

    #[test]
    fn test_missing_toc_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name("iets anders").unwrap();
        workbook.save(&input).unwrap();
        assert!(read_toc(&input, "inhoudsopgave").unwrap().is_none());

        assert!(matches!(
            read_toc(&dir.path().join("absent.xlsx"), "inhoudsopgave"),
            Err(ReportError::InputWorkbook { .. })
        ));
    }
}
