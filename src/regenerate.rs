//! CSV Regenerator
//!
//! Rewrites the hoofd, sub and waterstand CSVs from the fused model:
//! `START`/`EIND` from hist-tag coverage, aggregated sub-loc fields and the
//! latest hist tag per water level. Only the columns of the source CSV are
//! written, in their original order.

use crate::fews::{csv_io, LocationSet};
use crate::model::{MptModel, MptRange};
use crate::types::dates::format_yyyymmdd;
use crate::types::{parent_id, Table};
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Sub-loc reference columns and the gauge column they are filled into.
const GAUGE_COLUMNS: [(&str, &str); 2] = [("HBOV", "HBOVPS"), ("HBEN", "HBENPS")];

#[derive(Debug, Error)]
pub enum RegenerateError {
    #[error("Cannot create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: csv::Error,
    },
}

/// A regenerated location table ready to be written.
#[derive(Debug, Clone)]
pub struct RegeneratedCsv {
    pub set_id: String,
    pub file_name: String,
    pub table: Table,
}

/// Dates derived from the mpt table.
struct DateUpdate<'a> {
    mpt: &'a BTreeMap<String, MptRange>,
    threshold: Option<NaiveDateTime>,
    open_end: &'a str,
}

impl DateUpdate<'_> {
    fn apply(&self, table: &mut Table) {
        let Some(threshold) = self.threshold else {
            return;
        };
        let has_start = table.has_column("START");
        let has_end = table.has_column("EIND");
        for row in 0..table.len() {
            let Some(range) = self.mpt.get(table.value(row, "LOC_ID")) else {
                continue;
            };
            if has_start {
                table.set(row, "START", format_yyyymmdd(&range.start));
            }
            if has_end {
                let eind = if range.end > threshold {
                    self.open_end.to_string()
                } else {
                    format_yyyymmdd(&range.end)
                };
                table.set(row, "EIND", eind);
            }
        }
    }
}

fn source_table(set: &LocationSet) -> Table {
    set.table.select(set.source_columns())
}

fn regenerate_sub(model: &MptModel) -> Table {
    let mut table = source_table(&model.sub);

    if table.has_column("PAR_ID") {
        for row in 0..table.len() {
            let par_id = parent_id(table.value(row, "LOC_ID"));
            table.set(row, "PAR_ID", par_id);
        }
    }

    if table.has_column("ALLE_TYPES") {
        let mut types: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in table.rows() {
            let t = row.value("TYPE");
            if !t.is_empty() {
                types
                    .entry(row.value("PAR_ID").to_string())
                    .or_default()
                    .insert(t.to_string());
            }
        }
        for row in 0..table.len() {
            let joined = types
                .get(table.value(row, "PAR_ID"))
                .map(|t| t.iter().map(String::as_str).collect::<Vec<_>>().join("/"))
                .unwrap_or_default();
            table.set(row, "ALLE_TYPES", joined);
        }
    }

    for (reference, gauge) in GAUGE_COLUMNS {
        if !table.has_column(gauge) {
            continue;
        }
        for row in 0..table.len() {
            let ws = table.value(row, reference);
            if ws.is_empty() {
                continue;
            }
            if let Some(ws_row) = model.waterstand.get(ws) {
                let peilschaal = ws_row.value("PEILSCHAAL").to_string();
                table.set(row, gauge, peilschaal);
            }
        }
    }
    table
}

fn regenerate_waterstand(model: &MptModel) -> Table {
    let mut table = source_table(&model.waterstand);
    if !table.has_column("HIST_TAG") {
        return table;
    }

    let mut latest: BTreeMap<&str, (&str, NaiveDateTime)> = BTreeMap::new();
    for tag in model.expanded_histtags() {
        let slot = latest
            .entry(tag.loc_id.as_str())
            .or_insert((tag.serie.as_str(), tag.end));
        if tag.end > slot.1 {
            *slot = (tag.serie.as_str(), tag.end);
        }
    }
    for row in 0..table.len() {
        if let Some((serie, _)) = latest.get(table.value(row, "LOC_ID")) {
            let serie = (*serie).to_string();
            table.set(row, "HIST_TAG", serie);
        }
    }
    table
}

/// Build the three regenerated tables. `new_hoofd` is the refreshed hoofd
/// table from the h-loc check, when it passed.
pub fn regenerate(model: &MptModel, new_hoofd: Option<&Table>) -> Vec<RegeneratedCsv> {
    let mpt = model.mpt();
    let lookback = Duration::weeks(model.config.regenerate.lookback_weeks);
    let dates = DateUpdate {
        mpt,
        threshold: mpt.values().map(|r| r.end).max().map(|end| end - lookback),
        open_end: &model.config.regenerate.open_end_date,
    };
    if let Some(threshold) = dates.threshold {
        info!(threshold = %threshold, "Locations ending after the threshold are open-ended");
    } else {
        warn!("No hist tags mapped to any location, START/EIND left unchanged");
    }

    let mut hoofd = match new_hoofd {
        Some(table) => table.clone(),
        None => {
            warn!("Refreshed hoofd table not available, regenerating from the original");
            source_table(&model.hoofd)
        }
    };
    let mut sub = regenerate_sub(model);
    let mut waterstand = regenerate_waterstand(model);
    for table in [&mut hoofd, &mut sub, &mut waterstand] {
        dates.apply(table);
    }

    [
        (&model.hoofd, hoofd),
        (&model.sub, sub),
        (&model.waterstand, waterstand),
    ]
    .into_iter()
    .map(|(set, table)| RegeneratedCsv {
        set_id: set.id().to_string(),
        file_name: set.csv_file_name(),
        table,
    })
    .collect()
}

/// Write the regenerated tables into `out_dir`, returning the written paths.
pub fn write_all(out_dir: &Path, tables: &[RegeneratedCsv]) -> Result<Vec<PathBuf>, RegenerateError> {
    std::fs::create_dir_all(out_dir).map_err(|source| RegenerateError::CreateDir {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(tables.len());
    for regenerated in tables {
        let path = out_dir.join(&regenerated.file_name);
        csv_io::write_table(&path, &regenerated.table).map_err(|source| RegenerateError::Write {
            path: path.clone(),
            source,
        })?;
        info!(
            set = %regenerated.set_id,
            rows = regenerated.table.len(),
            path = %path.display(),
            "CSV regenerated"
        );
        written.push(path);
    }
    Ok(written)
}
