//! Hist-tag inventory and the derivations built on it: the serie →
//! internal-location join, the expanded per-location rows and `mpt_table`.

use crate::fews::{csv_io, LoadError};
use crate::types::dates::{format_datetime, parse_datetime};
use crate::types::{group_key, HistTag, IdMapEntry, Table};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::Path;

pub const SERIE_COLUMN: &str = "serie";
pub const START_COLUMN: &str = "total_min_start_dt";
pub const END_COLUMN: &str = "total_max_end_dt";

/// Read the inventory CSV. The delimiter is sniffed; any unparseable date is
/// fatal.
pub fn read_histtags(path: &Path) -> Result<Vec<HistTag>, LoadError> {
    let table = csv_io::read_table(path, None)?;
    histtags_from_table(&table, path)
}

pub fn histtags_from_table(table: &Table, path: &Path) -> Result<Vec<HistTag>, LoadError> {
    csv_io::require_columns(table, path, &[SERIE_COLUMN, START_COLUMN, END_COLUMN])?;
    let parse = |row: &crate::types::Row<'_>, column: &str| {
        let value = row.value(column);
        parse_datetime(value).ok_or_else(|| LoadError::InvalidDate {
            path: path.to_path_buf(),
            column: column.to_string(),
            value: value.to_string(),
        })
    };

    let mut tags = Vec::with_capacity(table.len());
    for row in table.rows() {
        let serie = row.value(SERIE_COLUMN);
        if serie.is_empty() {
            continue;
        }
        let start = parse(&row, START_COLUMN)?;
        let end = parse(&row, END_COLUMN)?;
        tags.push(HistTag::new(serie, start, end));
    }
    Ok(tags)
}

/// A hist-tag row attached to one of the internal locations it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedHistTag {
    pub loc_id: String,
    pub serie: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Observed measuring period of an internal location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MptRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MptRange {
    fn widen(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
    }
}

/// Serie → internal locations, over every id-map entry given. Only series
/// present in `tags` are kept; locations keep id-map order.
pub fn hist_to_intloc<'a, I>(tags: &[HistTag], entries: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a IdMapEntry>,
{
    let wanted: std::collections::HashSet<&str> = tags.iter().map(|t| t.serie.as_str()).collect();
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let serie = entry.serie();
        if !wanted.contains(serie.as_str()) {
            continue;
        }
        let locs = map.entry(serie).or_default();
        if !locs.contains(&entry.internal_location) {
            locs.push(entry.internal_location.clone());
        }
    }
    map
}

/// One row per (hist tag, mapped internal location).
pub fn expand(tags: &[HistTag], join: &BTreeMap<String, Vec<String>>) -> Vec<ExpandedHistTag> {
    let mut rows = Vec::new();
    for tag in tags {
        let Some(locs) = join.get(&tag.serie) else {
            continue;
        };
        for loc in locs {
            rows.push(ExpandedHistTag {
                loc_id: loc.clone(),
                serie: tag.serie.clone(),
                start: tag.start,
                end: tag.end,
            });
        }
    }
    rows
}

/// Per internal location the earliest start and latest end. Every location
/// not ending in `0` gets its `…0` counterpart, filled from all locations
/// sharing the first seven characters when it has no tags of its own.
pub fn build_mpt_table(expanded: &[ExpandedHistTag]) -> BTreeMap<String, MptRange> {
    let mut mpt: BTreeMap<String, MptRange> = BTreeMap::new();
    for row in expanded {
        mpt.entry(row.loc_id.clone())
            .and_modify(|r| r.widen(row.start, row.end))
            .or_insert(MptRange {
                start: row.start,
                end: row.end,
            });
    }

    let mut missing: Vec<String> = mpt
        .keys()
        .filter(|k| !k.ends_with('0'))
        .map(|k| {
            let mut h = k.clone();
            h.pop();
            h.push('0');
            h
        })
        .filter(|h| !mpt.contains_key(h))
        .collect();
    missing.dedup();

    for h in missing {
        let key = group_key(&h).to_string();
        let range = mpt
            .iter()
            .filter(|(loc, _)| group_key(loc) == key)
            .map(|(_, r)| *r)
            .reduce(|mut a, b| {
                a.widen(b.start, b.end);
                a
            });
        if let Some(range) = range {
            mpt.insert(h, range);
        }
    }
    mpt
}

/// Report view of `mpt_table`.
pub fn mpt_sheet(mpt: &BTreeMap<String, MptRange>) -> Table {
    let mut table = Table::new(&["LOC_ID", "STARTDATE", "ENDDATE"]);
    for (loc, range) in mpt {
        table.push_row(vec![
            loc.clone(),
            format_datetime(&range.start),
            format_datetime(&range.end),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_invalid_date_is_fatal() {
        let mut table = Table::new(&[SERIE_COLUMN, START_COLUMN, END_COLUMN]);
        table.push_row(vec!["1000_HS1", "2020-01-01", "gisteren"]);
        let err = histtags_from_table(&table, Path::new("tags.csv")).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDate { ref value, .. } if value == "gisteren"));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let table = Table::new(&[SERIE_COLUMN]);
        let err = histtags_from_table(&table, Path::new("tags.csv")).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { .. }));
    }

    #[test]
    fn test_join_and_expand() {
        let tags = vec![
            HistTag::new("1000_SW1", dt(2020, 1, 1), dt(2020, 6, 1)),
            HistTag::new("9999_XX1", dt(2020, 1, 1), dt(2020, 6, 1)),
        ];
        let entries = vec![
            IdMapEntry::new("1000", "SW1", "KW100011", "Hk.0"),
            IdMapEntry::new("1000", "SW1", "KW100012", "Hk.0"),
            IdMapEntry::new("1000", "SW1", "KW100012", "Hk.0"),
        ];
        let join = hist_to_intloc(&tags, &entries);
        assert_eq!(join["1000_SW1"], vec!["KW100011", "KW100012"]);
        assert!(!join.contains_key("9999_XX1"));
        assert_eq!(expand(&tags, &join).len(), 2);
    }

    #[test]
    fn test_mpt_inserts_missing_hloc_from_siblings() {
        let rows = vec![
            ExpandedHistTag {
                loc_id: "KW100011".into(),
                serie: "a".into(),
                start: dt(2019, 1, 1),
                end: dt(2020, 1, 1),
            },
            ExpandedHistTag {
                loc_id: "KW100012".into(),
                serie: "b".into(),
                start: dt(2018, 1, 1),
                end: dt(2019, 1, 1),
            },
            ExpandedHistTag {
                loc_id: "KW100011".into(),
                serie: "c".into(),
                start: dt(2019, 6, 1),
                end: dt(2021, 1, 1),
            },
        ];
        let mpt = build_mpt_table(&rows);
        assert_eq!(mpt["KW100011"].start, dt(2019, 1, 1));
        assert_eq!(mpt["KW100011"].end, dt(2021, 1, 1));
        assert_eq!(mpt["KW100010"].start, dt(2018, 1, 1));
        assert_eq!(mpt["KW100010"].end, dt(2021, 1, 1));
        assert_eq!(mpt_sheet(&mpt).len(), 3);
    }

    #[test]
    fn test_mpt_keeps_own_hloc_dates() {
        let rows = vec![
            ExpandedHistTag {
                loc_id: "KW100010".into(),
                serie: "a".into(),
                start: dt(2020, 1, 1),
                end: dt(2020, 2, 1),
            },
            ExpandedHistTag {
                loc_id: "KW100011".into(),
                serie: "b".into(),
                start: dt(2010, 1, 1),
                end: dt(2030, 1, 1),
            },
        ];
        let mpt = build_mpt_table(&rows);
        assert_eq!(mpt["KW100010"].start, dt(2020, 1, 1));
    }
}
