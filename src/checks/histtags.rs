//! Hist tags against the id-maps.

use super::{CheckResult, HISTTAG_IGNORE_MATCH, HISTTAG_MISSING};
use crate::model::MptModel;
use crate::types::dates::format_datetime;
use crate::types::Table;
use std::collections::BTreeMap;

/// Hist tags that no id-map resolves, minus the ignored ones.
pub fn check_missing_histtags(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&["UNKNOWN_SERIE", "STARTDATE", "ENDDATE"]);
    let join = model.hist_to_intloc();
    for tag in &model.histtags {
        if join.contains_key(&tag.serie) || model.ignore.is_histtag_ignored(&tag.serie) {
            continue;
        }
        table.push_row(vec![
            tag.serie.clone(),
            format_datetime(&tag.start),
            format_datetime(&tag.end),
        ]);
    }
    table.dedup();
    CheckResult::new(HISTTAG_MISSING, table)
}

/// Ignored series that the main id-map does resolve.
pub fn check_ignored_histtags(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&["UNKNOWN_SERIE", "internalLocation"]);

    let mut main_join: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for entry in model.main_entries() {
        let locs = main_join.entry(entry.serie()).or_default();
        if !locs.contains(&entry.internal_location.as_str()) {
            locs.push(&entry.internal_location);
        }
    }

    for serie in model.ignore.ignored_series() {
        if let Some(locs) = main_join.get(serie) {
            table.push_row(vec![serie.to_string(), locs.join(",")]);
        }
    }
    CheckResult::new(HISTTAG_IGNORE_MATCH, table)
}
