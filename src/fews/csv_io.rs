//! CSV reading and writing for location sets, attribute files, the hist-tag
//! inventory and the ignore lists.

use super::LoadError;
use crate::types::Table;
use std::path::Path;

/// Delimiters recognised when sniffing a header line.
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Pick the delimiter that occurs most often in `header`; comma on a tie.
pub fn detect_delimiter(header: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0;
    for d in DELIMITERS {
        let count = header.bytes().filter(|b| *b == d).count();
        if count > best_count {
            best = d;
            best_count = count;
        }
    }
    best
}

/// Parse CSV text into a `Table`. Cells are trimmed and a UTF-8 BOM on the
/// first header is dropped.
pub fn parse_table(text: &str, delimiter: u8) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(ToString::to_string).collect());
    }
    Ok(Table::from_rows(columns, rows))
}

/// Read a CSV file. `None` sniffs the delimiter from the header line.
pub fn read_table(path: &Path, delimiter: Option<u8>) -> Result<Table, LoadError> {
    if !path.is_file() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let delimiter =
        delimiter.unwrap_or_else(|| detect_delimiter(text.lines().next().unwrap_or_default()));
    parse_table(&text, delimiter).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Fail unless every column in `required` exists in `table`.
pub fn require_columns(table: &Table, path: &Path, required: &[&str]) -> Result<(), LoadError> {
    for column in required {
        if !table.has_column(column) {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

/// Write a table as comma-separated CSV with a header row.
pub fn write_table(path: &Path, table: &Table) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.raw_rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
