//! Stuurpeil (`HR.`) series across the sub-locs of one structure.
//!
//! Sub-locs fed by the same external location (after folding the shared
//! `8..` externals into their structure) form a group. Within a group a
//! setpoint on one sub-loc is expected on its active siblings, never on
//! krooshek or debietmeter sub-locs, and never ambiguous.

use super::{CheckResult, TIMESERIES_ERROR};
use crate::model::MptModel;
use crate::types::{generalise_parameter, group_key, EndDate, IdMapEntry, Table};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// Types that never carry a setpoint.
const NO_SETPOINT: [&str; 2] = ["krooshek", "debietmeter"];
/// Types not expected to follow a sibling's setpoint.
const SETPOINT_EXEMPT: [&str; 4] = ["krooshek", "debietmeter", "totaal", "vispassage"];

/// Generalised external parameter is a stuurpeil (`HR.`).
fn is_setpoint(entry: &IdMapEntry) -> bool {
    generalise_parameter(&entry.external_parameter).starts_with("HR.")
}

/// `8..` or `.8..`: a shared external location.
fn is_eight_shaped(ex_loc: &str) -> bool {
    let bytes = ex_loc.as_bytes();
    match bytes.len() {
        3 => bytes[0] == b'8',
        4 => bytes[1] == b'8',
        _ => false,
    }
}

fn unique_join<'a>(values: impl Iterator<Item = &'a str>, sep: &str) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.join(sep)
}

/// Group id per external location of one sub-loc group.
fn assign_groups<'a>(
    model: &MptModel,
    entries: &BTreeMap<&'a str, Vec<&'a IdMapEntry>>,
) -> HashMap<&'a str, usize> {
    let externals: BTreeSet<&str> = entries
        .values()
        .flatten()
        .map(|e| e.external_location.as_str())
        .collect();
    let mut gid: HashMap<&str, usize> = externals.iter().enumerate().map(|(i, e)| (*e, i)).collect();

    let mut unmerged: Vec<&str> = Vec::new();
    for ex_loc in externals.iter().copied().filter(|e| is_eight_shaped(e)) {
        let fed: Vec<&str> = entries
            .iter()
            .filter(|(int_loc, list)| {
                list.iter().any(|e| e.external_location == ex_loc)
                    && !model.ignore.is_ts800_ignored(ex_loc, int_loc)
            })
            .map(|(int_loc, _)| *int_loc)
            .collect();
        if fed.is_empty() {
            continue;
        }
        let partner = fed.iter().find_map(|int_loc| {
            entries[int_loc]
                .iter()
                .map(|e| e.external_location.as_str())
                .find(|e| !is_eight_shaped(e))
        });
        match partner {
            Some(p) => {
                let target = gid[p];
                gid.insert(ex_loc, target);
            }
            None => unmerged.push(ex_loc),
        }
    }

    let plain: BTreeSet<usize> = externals
        .iter()
        .filter(|e| !is_eight_shaped(e))
        .map(|e| gid[e])
        .collect();
    if let ([target], [ex_loc]) = (
        plain.iter().copied().collect::<Vec<_>>().as_slice(),
        unmerged.as_slice(),
    ) {
        gid.insert(*ex_loc, *target);
    }
    gid
}

/// `HR.` conflicts of one sub-loc.
fn setpoint_conflicts(entries: &[&IdMapEntry]) -> Vec<String> {
    let mut by_serie: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut by_parameter: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| is_setpoint(e)) {
        by_serie
            .entry(entry.serie())
            .or_default()
            .insert(entry.internal_parameter.as_str());
        by_parameter
            .entry(entry.internal_parameter.as_str())
            .or_default()
            .insert(entry.serie());
    }

    let mut errors = Vec::new();
    for (serie, pars) in &by_serie {
        if pars.len() > 1 {
            let pars: Vec<&str> = pars.iter().copied().collect();
            errors.push(format!("{serie} gekoppeld aan meerdere parameters ({})", pars.join(",")));
        }
    }
    for (par, series) in &by_parameter {
        if series.len() > 1 {
            let series: Vec<&str> = series.iter().map(String::as_str).collect();
            errors.push(format!("meerdere stuurpeilen op {par} ({})", series.join(",")));
        }
    }
    errors
}

/// `today` decides which sub-locs are still active.
pub fn check_timeseries(model: &MptModel, today: NaiveDate) -> CheckResult {
    let mut table = Table::new(&[
        "internalLocation",
        "eind",
        "internalParameters",
        "externalParameters",
        "externalLocations",
        "type",
        "fout",
    ]);

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, loc_id) in model.sub.loc_ids().enumerate() {
        groups.entry(group_key(loc_id)).or_default().push(i);
    }

    for rows in groups.values() {
        let entries: BTreeMap<&str, Vec<&IdMapEntry>> = rows
            .iter()
            .map(|&i| {
                let loc_id = model.sub.loc_id(i);
                (loc_id, model.main_entries_for(loc_id))
            })
            .collect();
        let gid = assign_groups(model, &entries);

        let with_setpoint: Vec<(&str, BTreeSet<usize>)> = entries
            .iter()
            .filter(|(_, list)| list.iter().any(|e| is_setpoint(e)))
            .map(|(loc, list)| {
                let gids = list.iter().map(|e| gid[e.external_location.as_str()]).collect();
                (*loc, gids)
            })
            .collect();

        for &i in rows {
            let row = model.sub.table.row(i);
            let loc_id = row.value("LOC_ID");
            let list = &entries[loc_id];
            let loc_type = row.value("TYPE").to_lowercase();
            let eind = row.value("EIND");
            let has_setpoint = list.iter().any(|e| is_setpoint(e));

            let mut errors = Vec::new();
            if has_setpoint && NO_SETPOINT.contains(&loc_type.as_str()) {
                errors.push(format!("{loc_type} met stuurpeil"));
            }

            if !has_setpoint && !SETPOINT_EXEMPT.contains(&loc_type.as_str()) {
                let own: BTreeSet<usize> = list
                    .iter()
                    .map(|e| gid[e.external_location.as_str()])
                    .collect();
                let siblings: Vec<&str> = with_setpoint
                    .iter()
                    .filter(|(sib, gids)| *sib != loc_id && !gids.is_disjoint(&own))
                    .map(|(sib, _)| *sib)
                    .collect();
                if !siblings.is_empty() {
                    let end = EndDate::parse(eind);
                    if end == EndDate::Open && !eind.is_empty() {
                        warn!(location = %loc_id, eind = %eind, "End date beyond 2100, treated as open");
                    }
                    if end.is_after(today) {
                        errors.push(format!(
                            "{loc_type} zonder stuurpeil ({} wel)",
                            siblings.join(",")
                        ));
                    }
                }
            }

            errors.extend(setpoint_conflicts(list));

            for fout in errors {
                table.push_row(vec![
                    loc_id.to_string(),
                    eind.to_string(),
                    unique_join(list.iter().map(|e| e.internal_parameter.as_str()), ","),
                    unique_join(list.iter().map(|e| e.external_parameter.as_str()), ","),
                    unique_join(list.iter().map(|e| e.external_location.as_str()), ","),
                    loc_type.clone(),
                    fout,
                ]);
            }
        }
    }
    CheckResult::new(TIMESERIES_ERROR, table)
}
