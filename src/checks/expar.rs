//! External parameters per internal location: allow-lists by location type
//! and the required series of hoofd-locs.

use super::{flag, CheckResult, EXPAR_ERROR, EXPAR_MISSING, INTLOC_MISSING};
use crate::model::MptModel;
use crate::types::{generalise_parameter, LocationClass, Table};
use regex::Regex;
use std::collections::BTreeSet;

const CURRENT_PARS: [&str; 3] = ["IB.", "IH.", "IL."];
const CURRENT_PARS_ALT: [&str; 3] = ["I.B", "I.H", "I.L"];

/// External parameters of one internal location in the main id-map, in file
/// order without duplicates, plus their generalised forms.
fn external_parameters(model: &MptModel, int_loc: &str) -> (Vec<String>, BTreeSet<String>) {
    let mut ex_pars: Vec<String> = Vec::new();
    for entry in model.main_entries_for(int_loc) {
        if !ex_pars.contains(&entry.external_parameter) {
            ex_pars.push(entry.external_parameter.clone());
        }
    }
    let generalised = ex_pars.iter().map(|p| generalise_parameter(p)).collect();
    (ex_pars, generalised)
}

fn not_allowed(ex_pars: &[String], allowed: &[&Regex]) -> Vec<String> {
    ex_pars
        .iter()
        .filter(|p| !allowed.iter().any(|re| re.is_match(p)))
        .cloned()
        .collect()
}

/// Sub-loc flags: `(FQ, I.X, IX., SS./SM.)`.
fn sub_flags(generalised: &BTreeSet<String>, loc_type: &str) -> (bool, bool, bool, bool) {
    let has = |p: &str| generalised.contains(p);
    let any_current = CURRENT_PARS.iter().any(|p| has(*p));
    let any_current_alt = CURRENT_PARS_ALT.iter().any(|p| has(*p));

    let schuif = loc_type.eq_ignore_ascii_case("schuif") && !has("SS.") && !has("SM.");
    let ix = CURRENT_PARS_ALT
        .iter()
        .zip(CURRENT_PARS)
        .any(|(alt, cur)| has(*alt) && !has(cur));
    let i_x = any_current && !any_current_alt;
    let fq = has("FQ.") && !any_current && !any_current_alt;
    (fq, i_x, ix, schuif)
}

/// Returns the `exPar error` result and the `intLoc missend` result.
pub fn check_expar_errors(model: &MptModel) -> (CheckResult, CheckResult) {
    let mut errors = Table::new(&[
        "internalLocation",
        "locationType",
        "exParError",
        "types",
        "FQ",
        "I.X",
        "IX.",
        "SS./SM.",
    ]);
    let mut missing = Table::new(&["internalLocation"]);

    for int_loc in model.main_internal_locations() {
        let class = model.classify(int_loc);
        let (ex_pars, generalised) = external_parameters(model, int_loc);

        let (bad, types, flags) = match class {
            LocationClass::Unknown => {
                missing.push_row(vec![int_loc]);
                continue;
            }
            LocationClass::Waterstand | LocationClass::Msw => continue,
            LocationClass::Hoofd => {
                let allowed: Vec<&Regex> = model.rules.hoofd_patterns().iter().collect();
                (not_allowed(&ex_pars, &allowed), Vec::new(), None)
            }
            LocationClass::Sub => {
                let types = model.sub_types(int_loc);
                let allowed = model.rules.sub_patterns(types.iter().map(String::as_str));
                let loc_type = model
                    .sub
                    .get(int_loc)
                    .map(|r| r.value("TYPE"))
                    .unwrap_or_default();
                (
                    not_allowed(&ex_pars, &allowed),
                    types,
                    Some(sub_flags(&generalised, loc_type)),
                )
            }
        };

        let (fq, i_x, ix, schuif) = flags.unwrap_or_default();
        if bad.is_empty() && !(fq || i_x || ix || schuif) {
            continue;
        }
        errors.push_row(vec![
            int_loc.to_string(),
            class.as_str().to_string(),
            bad.join(","),
            types.join("/"),
            flag(fq),
            flag(i_x),
            flag(ix),
            flag(schuif),
        ]);
    }

    (
        CheckResult::new(EXPAR_ERROR, errors),
        CheckResult::new(INTLOC_MISSING, missing),
    )
}

/// Hoofd-locs lacking a required series. `HS.` is always required; `QR.` and
/// `QS.` only when a sub-loc of the h-loc measures flow.
pub fn check_expar_missing(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&["internalLocation", "exPars", "QR", "QS", "HS"]);

    for loc_id in model.hoofd.loc_ids() {
        let (ex_pars, generalised) = external_parameters(model, loc_id);
        let carries_flow = model
            .sub
            .table
            .rows()
            .filter(|r| r.value("PAR_ID") == loc_id)
            .flat_map(|r| model.main_entries_for(r.value("LOC_ID")))
            .map(|e| generalise_parameter(&e.external_parameter))
            .any(|p| p.starts_with('Q') || p.starts_with("FQ"));

        let hs = !generalised.contains("HS.");
        let qr = carries_flow && !generalised.contains("QR.");
        let qs = carries_flow && !generalised.contains("QS.");
        if !(hs || qr || qs) {
            continue;
        }
        table.push_row(vec![
            loc_id.to_string(),
            ex_pars.join(","),
            flag(qr),
            flag(qs),
            flag(hs),
        ]);
    }
    CheckResult::new(EXPAR_MISSING, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixture::{entry, push_named, ModelBuilder};
    use crate::types::IdMapEntry;

    fn add_sub(builder: &mut ModelBuilder, loc_id: &str, loc_type: &str) {
        push_named(
            &mut builder.sub,
            &[
                ("LOC_ID", loc_id),
                ("PAR_ID", "KW100010"),
                ("TYPE", loc_type),
            ],
        );
    }

    #[test]
    fn test_schuif_without_position_flags_once() {
        let mut builder = ModelBuilder::happy();
        add_sub(&mut builder, "KW100012", "schuif");
        builder.kunstwerken.push(entry("1000", "ES1", "KW100012", "POS.0"));
        let (errors, missing) = check_expar_errors(&builder.build());
        assert!(missing.table.is_empty());
        assert_eq!(errors.count(), 1);
        let row = errors.table.row(0);
        assert_eq!(row.value("internalLocation"), "KW100012");
        assert_eq!(row.value("locationType"), "subloc");
        assert_eq!(row.value("exParError"), "");
        assert_eq!(row.value("SS./SM."), "True");
        assert_eq!(row.value("FQ"), "False");
    }

    #[test]
    fn test_pump_current_flags() {
        let mut builder = ModelBuilder::happy();
        add_sub(&mut builder, "KW100012", "pomp");
        builder.kunstwerken.push(entry("1000", "FQ1", "KW100012", "Q.G.0"));
        builder.kunstwerken.push(entry("1000", "IB1", "KW100012", "IB.0"));
        let (errors, _) = check_expar_errors(&builder.build());
        let row = errors.table.row(0);
        assert_eq!(row.value("I.X"), "True");
        assert_eq!(row.value("IX."), "False");
        assert_eq!(row.value("FQ"), "False");
        assert_eq!(row.value("types"), "pomp");
    }

    #[test]
    fn test_disallowed_parameter_and_unknown_location() {
        let mut builder = ModelBuilder::happy();
        builder.kunstwerken.push(entry("1000", "FQ1", "KW100011", "Q.G.0"));
        builder.kunstwerken.push(entry("1000", "SW2", "KW100010", "Hk.0"));
        builder.kunstwerken.push(entry("1099", "HS1", "KW109990", "H.S.0"));
        let (errors, missing) = check_expar_errors(&builder.build());
        assert_eq!(errors.count(), 2);
        assert_eq!(errors.table.value(0, "internalLocation"), "KW100010");
        assert_eq!(errors.table.value(0, "exParError"), "SW2");
        assert_eq!(errors.table.value(1, "exParError"), "FQ1");
        assert_eq!(errors.table.value(1, "FQ"), "True");
        assert_eq!(missing.table.value(0, "internalLocation"), "KW109990");
    }

    #[test]
    fn test_flow_requires_qr_and_qs() {
        let mut builder = ModelBuilder::happy();
        builder.kunstwerken.push(entry("1000", "Q1", "KW100011", "Q.G.0"));
        let result = check_expar_missing(&builder.build());
        assert_eq!(result.count(), 1);
        let row = result.table.row(0);
        assert_eq!(row.value("exPars"), "HS1");
        assert_eq!(row.value("QR"), "True");
        assert_eq!(row.value("QS"), "True");
        assert_eq!(row.value("HS"), "False");
    }

    #[test]
    fn test_flow_with_qr_flags_only_qs() {
        let flow_with = |extra: &[IdMapEntry]| {
            let mut builder = ModelBuilder::happy();
            builder.kunstwerken.push(entry("1000", "Q1", "KW100011", "Q.G.0"));
            builder.kunstwerken.extend(extra.iter().cloned());
            check_expar_missing(&builder.build())
        };

        let result = flow_with(&[entry("1000", "QR1", "KW100010", "Q.R.0")]);
        assert_eq!(result.count(), 1);
        let row = result.table.row(0);
        assert_eq!(row.value("exPars"), "HS1,QR1");
        assert_eq!(row.value("QR"), "False");
        assert_eq!(row.value("QS"), "True");

        let result = flow_with(&[
            entry("1000", "QR1", "KW100010", "Q.R.0"),
            entry("1000", "QS1", "KW100010", "Q.S.0"),
        ]);
        assert!(result.table.is_empty());
    }

    #[test]
    fn test_missing_level_series() {
        let mut builder = ModelBuilder::happy();
        builder.kunstwerken.remove(0);
        let result = check_expar_missing(&builder.build());
        assert_eq!(result.table.value(0, "HS"), "True");
        assert_eq!(result.table.value(0, "QR"), "False");
    }
}
