//! Location-set well-formedness: names built from the CAW code, sibling
//! agreement on the CAW name, and references between the sets.

use super::{flag, CheckResult, LOCATION_SET_ERROR};
use crate::config::SectionKind;
use crate::fews::LocationSet;
use crate::model::MptModel;
use crate::types::{caw_code, Point, Row, Table};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Sub-loc types whose names carry no `-<type>_<functie>` suffix.
const UNTYPED_SUB_KINDS: [&str; 4] = ["afsluiter", "debietmeter", "krooshek", "vispassage"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetKind {
    Hoofd,
    Sub,
    Waterstand,
}

/// Findings on one row, before they are rendered.
#[derive(Debug, Default)]
struct RowFindings {
    name_error: bool,
    missing_in_map: bool,
    sets: Vec<String>,
    missing_in_set: Vec<String>,
    xy_not_same: bool,
}

fn name_pattern(kind: SetKind, caw: &str, row: &Row<'_>) -> Option<Regex> {
    let caw = regex::escape(caw);
    let pattern = match kind {
        SetKind::Hoofd => format!("^[A-Z0-9 ]*_{caw}-K_[A-Z0-9 ]*$"),
        SetKind::Waterstand => format!("^[A-Z0-9 ]*_{caw}-w_.*$"),
        SetKind::Sub => {
            let loc_type = row.value("TYPE").trim().to_lowercase();
            let functie = row.value("FUNCTIE").trim();
            if UNTYPED_SUB_KINDS.contains(&loc_type.as_str()) {
                format!("^[A-Z0-9 ]*_{caw}-K_.*$")
            } else if functie.is_empty() {
                format!(
                    "^[A-Z0-9 ]*_{caw}-K_[A-Z0-9 ]*-{}[0-9]*$",
                    regex::escape(&loc_type)
                )
            } else {
                format!(
                    "^[A-Z0-9 ]*_{caw}-K_[A-Z0-9 ]*-{}[0-9]*_{}$",
                    regex::escape(&loc_type),
                    regex::escape(functie)
                )
            }
        }
    };
    Regex::new(&pattern).ok()
}

/// Part of the name before `_<caw>`.
fn caw_name<'a>(name: &'a str, caw: &str) -> &'a str {
    Regex::new(&format!("^([A-Z0-9 ]*)_{}", regex::escape(caw)))
        .ok()
        .and_then(|re| re.captures(name))
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

fn differs(a: Option<Point>, b: Option<Point>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.same_xy(&b),
        (None, None) => false,
        _ => true,
    }
}

/// Record `column` values of `row` that are absent from `target`.
fn check_reference(
    findings: &mut RowFindings,
    row: &Row<'_>,
    columns: &[&str],
    target: &LocationSet,
) {
    for column in columns {
        let value = row.value(column).trim();
        if value.is_empty() || target.contains(value) {
            continue;
        }
        findings.missing_in_set.push(format!("{column}:{value}"));
        if !findings.sets.iter().any(|s| s == target.id()) {
            findings.sets.push(target.id().to_string());
        }
    }
}

fn check_set(out: &mut Table, model: &MptModel, set: &LocationSet, kind: SetKind, mapped: &HashSet<&str>) {
    let name_column = set.meta.name_column.as_deref().unwrap_or("LOC_NAME");

    // CAW code → distinct CAW names over the set
    let mut names_by_caw: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in set.table.rows() {
        let loc_id = row.value(&set.meta.id_column);
        if let Some(caw) = caw_code(loc_id) {
            names_by_caw
                .entry(caw)
                .or_default()
                .insert(caw_name(row.value(name_column), caw));
        }
    }

    for (i, row) in set.table.rows().enumerate() {
        let loc_id = row.value(&set.meta.id_column);
        let caw = caw_code(loc_id).unwrap_or_default();
        let name = row.value(name_column);
        let mut findings = RowFindings {
            name_error: name_pattern(kind, caw, &row).map_or(true, |re| !re.is_match(name)),
            ..Default::default()
        };
        let inconsistent = names_by_caw.get(caw).is_some_and(|names| names.len() > 1);

        match kind {
            SetKind::Sub => {
                check_reference(&mut findings, &row, &["HBOV", "HBEN"], &model.waterstand);
                check_reference(&mut findings, &row, &["HBOVPS", "HBENPS"], &model.peilschaal);
                check_reference(&mut findings, &row, &["PAR_ID"], &model.hoofd);
                let par_id = row.value("PAR_ID");
                if model.hoofd.contains(par_id) && model.ignore.xy_override(loc_id).is_none() {
                    findings.xy_not_same =
                        differs(set.geometry[i], model.hoofd.geometry_of(par_id));
                }
            }
            SetKind::Waterstand => {
                check_reference(&mut findings, &row, &["PEILSCHAAL"], &model.peilschaal);
                findings.missing_in_map = !mapped.contains(loc_id);
            }
            SetKind::Hoofd => {}
        }

        let any = findings.name_error
            || inconsistent
            || findings.missing_in_map
            || !findings.missing_in_set.is_empty()
            || findings.xy_not_same;
        if !any {
            continue;
        }
        let (loc_type, functie) = match kind {
            SetKind::Sub => (row.value("TYPE"), row.value("FUNCTIE")),
            _ => ("", ""),
        };
        out.push_row(vec![
            set.meta.csv_file.clone(),
            loc_id.to_string(),
            caw.to_string(),
            caw_name(name, caw).to_string(),
            loc_type.to_string(),
            functie.to_string(),
            flag(findings.name_error),
            flag(inconsistent),
            flag(findings.missing_in_map),
            findings.sets.join(","),
            findings.missing_in_set.join(","),
            flag(findings.xy_not_same),
        ]);
    }
}

pub fn check_location_sets(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&[
        "bestand",
        "locationId",
        "caw_code",
        "caw_name",
        "type",
        "functie",
        "name_error",
        "caw_name_inconsistent",
        "missing_in_map",
        "set",
        "missing_in_set",
        "xy_not_same",
    ]);
    let mapped = model.main_section_locations(SectionKind::Waterstandlocaties);
    for (set, kind) in [
        (&model.waterstand, SetKind::Waterstand),
        (&model.sub, SetKind::Sub),
        (&model.hoofd, SetKind::Hoofd),
    ] {
        check_set(&mut table, model, set, kind, &mapped);
    }
    CheckResult::new(LOCATION_SET_ERROR, table)
}
