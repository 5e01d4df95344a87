//! H-loc consistency: every sub-loc of one hoofd-loc must agree on the
//! short name, the position and the administrative fields. When they all do,
//! the hoofd table is rebuilt from the sub-locs.

use super::{CheckResult, HLOC_ERROR};
use crate::model::MptModel;
use crate::types::{caw_code, Point, Table};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Fields that must hold exactly one value over a group.
const UNIQUE_FIELDS: [&str; 3] = ["SYSTEEM", "RAYON", "KOMPAS"];

/// Result of the h-loc check plus the refreshed hoofd table.
#[derive(Debug, Clone)]
pub struct HlocOutcome {
    pub result: CheckResult,
    pub new_hoofd: Option<Table>,
}

/// Aggregated fields of one `PAR_ID` group.
#[derive(Debug, Clone, Default)]
struct GroupFields {
    loc_name: String,
    x: String,
    y: String,
    alle_types: String,
    start: String,
    eind: String,
    unique: BTreeMap<&'static str, String>,
}

/// Values in first-seen order without duplicates.
fn unique_in_order<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

pub fn check_hloc_consistency(model: &MptModel) -> HlocOutcome {
    let mut table = Table::new(&[
        "LOC_ID", "SUB_LOCS", "LOC_NAME", "GEOMETRY", "SYSTEEM", "RAYON", "KOMPAS",
    ]);

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, row) in model.sub.table.rows().enumerate() {
        groups.entry(row.value("PAR_ID")).or_default().push(i);
    }

    let mut aggregated: Vec<(&str, GroupFields)> = Vec::new();
    for (par_id, rows) in &groups {
        let sub_rows: Vec<_> = rows.iter().map(|&i| model.sub.table.row(i)).collect();
        let mut fields = GroupFields::default();
        let mut name_error = String::new();
        let mut geometry_error = String::new();

        // short name shared by every sub-loc
        let code = caw_code(par_id).unwrap_or_default();
        let short_name = Regex::new(&format!("[A-Z0-9 ]*_{}-K_[A-Z0-9 ]*", regex::escape(code))).ok();
        let mut all_match = true;
        let names: Vec<&str> = sub_rows
            .iter()
            .map(|r| {
                let name = r.value("LOC_NAME");
                match short_name.as_ref().and_then(|re| re.find(name)) {
                    Some(m) => m.as_str(),
                    None => {
                        all_match = false;
                        name
                    }
                }
            })
            .collect();
        let unique_names = unique_in_order(names.iter().copied());
        if unique_names.len() == 1 && all_match {
            fields.loc_name = unique_names[0].to_string();
        } else {
            name_error = unique_names.join(",");
        }

        // position, unless the h-loc has a tolerated override
        if let Some(xy) = model.ignore.xy_override(par_id) {
            fields.x = xy.x.clone();
            fields.y = xy.y.clone();
        } else {
            let mut points: Vec<Option<Point>> = Vec::new();
            for &i in rows {
                let p = model.sub.geometry[i];
                let seen = points.iter().any(|q| match (q, &p) {
                    (Some(a), Some(b)) => a.same_xy(b),
                    (None, None) => true,
                    _ => false,
                });
                if !seen {
                    points.push(p);
                }
            }
            match points.as_slice() {
                [Some(_)] => {
                    let first = &sub_rows[0];
                    fields.x = first.value(&model.sub.meta.x_column).to_string();
                    fields.y = first.value(&model.sub.meta.y_column).to_string();
                }
                _ => {
                    geometry_error = points
                        .iter()
                        .map(|p| match p {
                            Some(p) => format!("({} {})", p.x, p.y),
                            None => "(leeg)".to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                }
            }
        }

        let mut types: Vec<&str> = unique_in_order(sub_rows.iter().map(|r| r.value("TYPE")));
        types.sort_unstable();
        fields.alle_types = types.join("/");
        fields.start = sub_rows
            .iter()
            .map(|r| r.value("START"))
            .min()
            .unwrap_or_default()
            .to_string();
        fields.eind = sub_rows
            .iter()
            .map(|r| r.value("EIND"))
            .max()
            .unwrap_or_default()
            .to_string();

        let mut unique_errors: BTreeMap<&str, String> = BTreeMap::new();
        for field in UNIQUE_FIELDS {
            let values = unique_in_order(sub_rows.iter().map(|r| r.value(field)));
            if values.len() == 1 {
                fields.unique.insert(field, values[0].to_string());
            } else {
                unique_errors.insert(field, values.join(","));
            }
        }

        if name_error.is_empty() && geometry_error.is_empty() && unique_errors.is_empty() {
            aggregated.push((*par_id, fields));
            continue;
        }
        let sub_locs: Vec<&str> = sub_rows.iter().map(|r| r.value("LOC_ID")).collect();
        let mut row = vec![
            par_id.to_string(),
            sub_locs.join(","),
            name_error,
            geometry_error,
        ];
        for field in UNIQUE_FIELDS {
            row.push(unique_errors.remove(field).unwrap_or_default());
        }
        table.push_row(row);
    }

    let new_hoofd = if table.is_empty() {
        Some(build_new_hoofd(model, &aggregated))
    } else {
        warn!(
            groups = table.len(),
            "H-loc inconsistencies found, hoofd table will not be refreshed"
        );
        None
    };

    HlocOutcome {
        result: CheckResult::new(HLOC_ERROR, table),
        new_hoofd,
    }
}

/// Hoofd rows rebuilt from the aggregated groups, in the column order of the
/// hoofd CSV. Groups without a hoofd row are dropped.
fn build_new_hoofd(model: &MptModel, groups: &[(&str, GroupFields)]) -> Table {
    let dropped = dropped_hoofd_locations(model, groups);
    if !dropped.is_empty() {
        warn!(
            locations = %dropped.join(","),
            "Locations left out of the refreshed hoofd table"
        );
    }
    let columns = model.hoofd.source_columns().to_vec();
    let mut table = Table::new(&columns);
    for (par_id, fields) in groups {
        let Some(pos) = model.hoofd.position(par_id) else {
            continue;
        };
        let original = model.hoofd.table.row(pos);
        let row: Vec<String> = columns
            .iter()
            .map(|c| match c.as_str() {
                "LOC_NAME" => fields.loc_name.clone(),
                "ALLE_TYPES" => fields.alle_types.clone(),
                "START" => fields.start.clone(),
                "EIND" => fields.eind.clone(),
                c if c == model.hoofd.meta.x_column => fields.x.clone(),
                c if c == model.hoofd.meta.y_column => fields.y.clone(),
                c => fields
                    .unique
                    .get(c)
                    .cloned()
                    .unwrap_or_else(|| original.value(c).to_string()),
            })
            .collect();
        table.push_row(row);
    }
    info!(rows = table.len(), "Refreshed hoofd table built from sub-locs");
    table
}

/// Hoofd rows without sub-locs and `PAR_ID` groups without a hoofd row.
fn dropped_hoofd_locations<'a>(
    model: &'a MptModel,
    groups: &[(&'a str, GroupFields)],
) -> Vec<&'a str> {
    let mut dropped: Vec<&str> = model
        .hoofd
        .loc_ids()
        .filter(|loc_id| !groups.iter().any(|(par_id, _)| par_id == loc_id))
        .collect();
    dropped.extend(
        groups
            .iter()
            .map(|(par_id, _)| *par_id)
            .filter(|par_id| model.hoofd.position(par_id).is_none()),
    );
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixture::{push_named, ModelBuilder};
    use crate::model::INTERNAL_LOCATION;

    fn add_schuif(builder: &mut ModelBuilder, systeem: &str, x: &str) {
        push_named(
            &mut builder.sub,
            &[
                ("LOC_ID", "KW100012"),
                ("LOC_NAME", "STUW1_1000-K_STUW1-schuif1_sturing"),
                ("PAR_ID", "KW100010"),
                ("TYPE", "schuif"),
                ("FUNCTIE", "sturing"),
                ("X", x),
                ("Y", "450000"),
                ("START", "20190101"),
                ("EIND", "20210101"),
                ("SYSTEEM", systeem),
                ("RAYON", "R1"),
                ("KOMPAS", "N"),
            ],
        );
    }

    #[test]
    fn test_differing_systeem() {
        let mut builder = ModelBuilder::happy();
        add_schuif(&mut builder, "S2", "140000");
        let outcome = check_hloc_consistency(&builder.build());
        let t = &outcome.result.table;
        assert_eq!(t.len(), 1);
        assert_eq!(t.value(0, "LOC_ID"), "KW100010");
        assert_eq!(t.value(0, "SUB_LOCS"), "KW100011,KW100012");
        assert_eq!(t.value(0, "SYSTEEM"), "S1,S2");
        assert_eq!(t.value(0, "RAYON"), "");
        assert_eq!(t.value(0, "LOC_NAME"), "");
        assert!(outcome.new_hoofd.is_none());
    }

    #[test]
    fn test_consistent_group_builds_new_hoofd() {
        let mut builder = ModelBuilder::happy();
        add_schuif(&mut builder, "S1", "140000");
        let model = builder.build();
        let outcome = check_hloc_consistency(&model);
        assert!(outcome.result.table.is_empty());
        let hoofd = outcome.new_hoofd.unwrap();
        assert_eq!(hoofd.columns(), model.hoofd.source_columns());
        assert_eq!(hoofd.value(0, "ALLE_TYPES"), "schuif/stuw");
        assert_eq!(hoofd.value(0, "START"), "20190101");
        assert_eq!(hoofd.value(0, "EIND"), "20210101");
        assert_eq!(hoofd.value(0, "LOC_NAME"), "STUW1_1000-K_STUW1");
        assert_eq!(hoofd.value(0, "HS1_HMAX"), "2.0");
    }

    #[test]
    fn test_hoofd_without_sub_locs_is_left_out() {
        let mut builder = ModelBuilder::happy();
        push_named(
            &mut builder.hoofd,
            &[("LOC_ID", "KW100020"), ("LOC_NAME", "GEMAAL_1002-K_GEMAAL")],
        );
        let model = builder.build();
        let outcome = check_hloc_consistency(&model);
        let hoofd = outcome.new_hoofd.unwrap();
        assert_eq!(hoofd.len(), 1);
        assert_eq!(hoofd.value(0, "LOC_ID"), "KW100010");

        let groups = [("KW100010", GroupFields::default())];
        assert_eq!(dropped_hoofd_locations(&model, &groups), vec!["KW100020"]);
        let groups = [("KW100030", GroupFields::default())];
        assert_eq!(
            dropped_hoofd_locations(&model, &groups),
            vec!["KW100010", "KW100020", "KW100030"]
        );
    }

    #[test]
    fn test_geometry_mismatch_and_xy_ignore() {
        let mut builder = ModelBuilder::happy();
        add_schuif(&mut builder, "S1", "140010");
        let outcome = check_hloc_consistency(&builder.build());
        assert_eq!(
            outcome.result.table.value(0, "GEOMETRY"),
            "(140000 450000),(140010 450000)"
        );

        let mut builder = ModelBuilder::happy();
        add_schuif(&mut builder, "S1", "140010");
        push_named(
            &mut builder.ignored_xy,
            &[(INTERNAL_LOCATION, "KW10001"), ("x", "140005"), ("y", "450000")],
        );
        let outcome = check_hloc_consistency(&builder.build());
        assert!(outcome.result.table.is_empty());
        assert_eq!(outcome.new_hoofd.unwrap().value(0, "X"), "140005");
    }

    #[test]
    fn test_name_without_short_name() {
        let mut builder = ModelBuilder::happy();
        builder.sub.set(0, "LOC_NAME", "stuw zonder code");
        let outcome = check_hloc_consistency(&builder.build());
        assert_eq!(outcome.result.table.value(0, "LOC_NAME"), "stuw zonder code");
    }
}
