//! Spreadsheet I/O: the table of contents read from the input workbook and
//! the sheets of the output workbook.

use super::summary::Summary;
use super::ReportError;
use crate::types::Table;
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Columns wider than this are capped.
const MAX_COLUMN_WIDTH: f64 = 80.0;

/// Table-of-contents sheet: first column the sheet name, second column its
/// description. Extra columns are kept when the sheet is copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    pub table: Table,
}

impl Toc {
    /// Generated contents for workbooks without a table of contents.
    pub fn generated(sheets: &[(String, String)]) -> Self {
        let mut table = Table::new(&["werkblad", "beschrijving"]);
        for (sheet, description) in sheets {
            table.push_row(vec![sheet.as_str(), description.as_str()]);
        }
        Self { table }
    }

    /// Sheet name → description, skipping rows without a sheet name.
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.table
            .raw_rows()
            .iter()
            .filter_map(|cells| {
                let sheet = cells.first()?.trim();
                if sheet.is_empty() {
                    return None;
                }
                let description = cells.get(1).map_or("", |d| d.trim());
                Some((sheet.to_string(), description.to_string()))
            })
            .collect()
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Read the table-of-contents sheet. `Ok(None)` when the workbook has no
/// such sheet.
pub fn read_toc(path: &Path, sheet: &str) -> Result<Option<Toc>, ReportError> {
    let input_error = |source| ReportError::InputWorkbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(input_error)?;
    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        warn!(
            path = %path.display(),
            sheet = %sheet,
            "Input workbook has no table of contents, generating one"
        );
        return Ok(None);
    }
    let range = workbook.worksheet_range(sheet).map_err(input_error)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Some(Toc::default()));
    };
    let columns: Vec<String> = header.iter().map(cell_text).collect();
    let body: Vec<Vec<String>> = rows
        .map(|r| r.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|r| r.iter().any(|c| !c.is_empty()))
        .collect();
    debug!(rows = body.len(), "Table of contents read");
    Ok(Some(Toc {
        table: Table::from_rows(columns, body),
    }))
}

// ============================================================================
// Output workbook
// ============================================================================

/// Tab colour of a data sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    /// Red when the table has rows, green when empty
    ByContent,
    /// No colour
    Plain,
    /// Always green
    Green,
}

fn column_width(table: &Table, col: usize, min_width: f64) -> f64 {
    let header = table.columns().get(col).map_or(0, |c| c.chars().count());
    let longest = table
        .raw_rows()
        .iter()
        .filter_map(|r| r.get(col))
        .map(|c| c.chars().count())
        .fold(header, usize::max);
    #[allow(clippy::cast_precision_loss)]
    let wanted = longest as f64 + 2.0;
    wanted.clamp(min_width, MAX_COLUMN_WIDTH.max(min_width))
}

/// Widths, frozen header and auto-filter for a sheet of `rows` data rows.
fn finish_sheet(
    sheet: &mut Worksheet,
    widths: &[f64],
    rows: usize,
) -> Result<(), XlsxError> {
    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col_index(col), *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    if let Some(last_col) = widths.len().checked_sub(1) {
        sheet.autofilter(0, 0, row_index(rows), col_index(last_col))?;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn row_index(row: usize) -> u32 {
    row.min(u32::MAX as usize) as u32
}

#[allow(clippy::cast_possible_truncation)]
fn col_index(col: usize) -> u16 {
    col.min(u16::MAX as usize) as u16
}

/// Write `table` into a new sheet named `name`.
pub fn write_table_sheet(
    workbook: &mut Workbook,
    name: &str,
    table: &Table,
    tab: Tab,
    min_width: f64,
) -> Result<(), XlsxError> {
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    match tab {
        Tab::ByContent if table.is_empty() => {
            sheet.set_tab_color(Color::Green);
        }
        Tab::ByContent => {
            sheet.set_tab_color(Color::Red);
        }
        Tab::Green => {
            sheet.set_tab_color(Color::Green);
        }
        Tab::Plain => {}
    }

    for (col, column) in table.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col_index(col), column, &header)?;
    }
    for (row, cells) in table.raw_rows().iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if !cell.is_empty() {
                sheet.write_string(row_index(row + 1), col_index(col), cell)?;
            }
        }
    }

    let widths: Vec<f64> = (0..table.columns().len())
        .map(|col| column_width(table, col, min_width))
        .collect();
    finish_sheet(sheet, &widths, table.len())
}

/// The `samenvatting` sheet: check, count and description, with the count
/// cell red for failing checks and green otherwise.
pub fn write_summary_sheet(
    workbook: &mut Workbook,
    name: &str,
    summary: &Summary,
    min_width: f64,
) -> Result<(), XlsxError> {
    let header = Format::new().set_bold();
    let red = Format::new().set_background_color(Color::Red);
    let green = Format::new().set_background_color(Color::Green);

    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    for (col, column) in ["controle", "aantal", "beschrijving"].iter().enumerate() {
        sheet.write_string_with_format(0, col_index(col), *column, &header)?;
    }
    for (i, row) in summary.rows.iter().enumerate() {
        let r = row_index(i + 1);
        let fill = if row.is_failing() { &red } else { &green };
        sheet.write_string(r, 0, &row.sheet)?;
        #[allow(clippy::cast_precision_loss)]
        let count = row.count as f64;
        sheet.write_number_with_format(r, 1, count, fill)?;
        sheet.write_string(r, 2, &row.description)?;
    }

    let sheet_chars = summary
        .rows
        .iter()
        .map(|r| r.sheet.chars().count())
        .fold("controle".len(), usize::max);
    let description_chars = summary
        .rows
        .iter()
        .map(|r| r.description.chars().count())
        .fold("beschrijving".len(), usize::max);
    #[allow(clippy::cast_precision_loss)]
    let widths = [
        sheet_chars as f64 + 2.0,
        min_width,
        (description_chars as f64 + 2.0).min(MAX_COLUMN_WIDTH),
    ]
    .map(|w| w.max(min_width));
    finish_sheet(sheet, &widths, summary.rows.len())
}
