//! Operator-maintained ignore lists.

use crate::config::{anchored, PathsConfig};
use crate::fews::{csv_io, LoadError};
use crate::types::Table;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

pub const UNKNOWN_SERIE: &str = "UNKNOWN_SERIE";
pub const EXTERNAL_LOCATION: &str = "externalLocation";
pub const INTERNAL_LOCATION: &str = "internalLocation";

/// A tolerated coordinate mismatch: internal locations matching `pattern`
/// use `(x, y)` instead of their sub-loc geometry.
#[derive(Debug, Clone)]
pub struct XyIgnore {
    pub pattern: Regex,
    pub x: String,
    pub y: String,
}

/// The four ignore lists, as raw tables (copied into the report) and as
/// lookups.
#[derive(Debug, Clone, Default)]
pub struct IgnoreLists {
    pub histtag: Table,
    pub exloc: Table,
    pub ts800: Table,
    pub xy: Table,
    histtag_series: HashSet<String>,
    exloc_pairs: HashSet<(String, String)>,
    ts800_pairs: HashSet<(String, String)>,
    xy_rules: Vec<XyIgnore>,
}

impl IgnoreLists {
    pub fn load(paths: &PathsConfig) -> Result<Self, LoadError> {
        let histtag = csv_io::read_table(&paths.ignored_histtag, Some(b','))?;
        csv_io::require_columns(&histtag, &paths.ignored_histtag, &[UNKNOWN_SERIE])?;
        let exloc = csv_io::read_table(&paths.ignored_exloc, Some(b','))?;
        csv_io::require_columns(
            &exloc,
            &paths.ignored_exloc,
            &[EXTERNAL_LOCATION, INTERNAL_LOCATION],
        )?;
        let ts800 = csv_io::read_table(&paths.ignored_ts800, Some(b','))?;
        csv_io::require_columns(
            &ts800,
            &paths.ignored_ts800,
            &[EXTERNAL_LOCATION, INTERNAL_LOCATION],
        )?;
        let xy = csv_io::read_table(&paths.ignored_xy, Some(b','))?;
        csv_io::require_columns(&xy, &paths.ignored_xy, &[INTERNAL_LOCATION, "x", "y"])?;
        Self::from_tables(histtag, exloc, ts800, xy, &paths.ignored_xy)
    }

    /// Build the lookups. `xy_origin` is reported when a pattern does not compile.
    pub fn from_tables(
        mut histtag: Table,
        exloc: Table,
        ts800: Table,
        xy: Table,
        xy_origin: &Path,
    ) -> Result<Self, LoadError> {
        for row in 0..histtag.len() {
            let serie = histtag.value(row, UNKNOWN_SERIE).trim_start_matches('#').to_string();
            histtag.set(row, UNKNOWN_SERIE, serie);
        }
        let histtag_series = histtag
            .rows()
            .map(|r| r.value(UNKNOWN_SERIE).to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let pairs = |table: &Table| -> HashSet<(String, String)> {
            table
                .rows()
                .map(|r| {
                    (
                        r.value(EXTERNAL_LOCATION).to_string(),
                        r.value(INTERNAL_LOCATION).to_string(),
                    )
                })
                .collect()
        };
        let exloc_pairs = pairs(&exloc);
        let ts800_pairs = pairs(&ts800);

        let mut xy_rules = Vec::new();
        for row in xy.rows() {
            let pattern = row.value(INTERNAL_LOCATION);
            if pattern.is_empty() {
                continue;
            }
            let compiled = anchored(pattern).map_err(|source| LoadError::InvalidPattern {
                path: xy_origin.to_path_buf(),
                pattern: pattern.to_string(),
                source,
            })?;
            xy_rules.push(XyIgnore {
                pattern: compiled,
                x: row.value("x").to_string(),
                y: row.value("y").to_string(),
            });
        }

        Ok(Self {
            histtag,
            exloc,
            ts800,
            xy,
            histtag_series,
            exloc_pairs,
            ts800_pairs,
            xy_rules,
        })
    }

    pub fn is_histtag_ignored(&self, serie: &str) -> bool {
        self.histtag_series.contains(serie)
    }

    /// Ignored series in file order, without duplicates.
    pub fn ignored_series(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.histtag
            .rows()
            .map(|r| r.value(UNKNOWN_SERIE))
            .filter(|s| !s.is_empty() && seen.insert(*s))
            .collect()
    }

    pub fn is_exloc_ignored(&self, external: &str, internal: &str) -> bool {
        self.exloc_pairs
            .contains(&(external.to_string(), internal.to_string()))
    }

    pub fn is_ts800_ignored(&self, external: &str, internal: &str) -> bool {
        self.ts800_pairs
            .contains(&(external.to_string(), internal.to_string()))
    }

    /// First xy rule whose pattern matches `loc_id`.
    pub fn xy_override(&self, loc_id: &str) -> Option<&XyIgnore> {
        self.xy_rules.iter().find(|r| r.pattern.is_match(loc_id))
    }
}
