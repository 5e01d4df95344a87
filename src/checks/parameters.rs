//! Parameter checks: catalogue coverage and internal/external agreement.

use super::{CheckResult, PARAMETER_MISMATCH, PARAMETER_MISSING};
use crate::model::MptModel;
use crate::types::Table;
use std::collections::HashSet;

/// Internal parameters used in any id-map but absent from `Parameters.xml`.
pub fn check_missing_parameters(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&["parameters"]);
    let mut seen = HashSet::new();
    for entry in model.idmaps.iter().flat_map(|f| f.entries.iter()) {
        let par = entry.internal_parameter.as_str();
        if model.parameters.contains_key(par) || !seen.insert(par) {
            continue;
        }
        table.push_row(vec![par]);
    }
    CheckResult::new(PARAMETER_MISSING, table)
}

/// Main id-map rows whose external parameter does not fit the internal one
/// according to the parameter mapping.
pub fn check_parameter_mismatch(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&[
        "internalLocation",
        "internalParameter",
        "externalParameter",
        "fout",
    ]);

    for entry in model.main_entries() {
        let candidates: Vec<_> = model
            .rules
            .mappings()
            .iter()
            .filter(|m| m.internal.is_match(&entry.internal_parameter))
            .collect();
        let fout = if candidates.is_empty() {
            "pars niet opgenomen in config"
        } else if candidates
            .iter()
            .any(|m| m.external.is_match(&entry.external_parameter))
        {
            continue;
        } else {
            "parameter mismatch"
        };
        table.push_row(vec![
            entry.internal_location.as_str(),
            entry.internal_parameter.as_str(),
            entry.external_parameter.as_str(),
            fout,
        ]);
    }
    table.dedup();
    CheckResult::new(PARAMETER_MISMATCH, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixture::{entry, ModelBuilder};

    #[test]
    fn test_missing_parameter_reported_once() {
        let mut builder = ModelBuilder::happy();
        builder.parameters.retain(|p| p != "Hk.0");
        builder
            .other_idmaps
            .insert("IdOPVLWATER_HYMOS".to_string(), vec![entry("1000", "SW1", "KW100011", "Hk.0")]);
        let result = check_missing_parameters(&builder.build());
        assert_eq!(result.count(), 1);
        assert_eq!(result.table.value(0, "parameters"), "Hk.0");
    }

    #[test]
    fn test_parameter_mismatch_and_unmapped() {
        let mut builder = ModelBuilder::happy();
        builder.kunstwerken.push(entry("1000", "Q1", "KW100011", "Hk.0"));
        builder.kunstwerken.push(entry("1000", "XY1", "KW100011", "ZZ.0"));
        let result = check_parameter_mismatch(&builder.build());
        assert_eq!(result.count(), 2);
        assert_eq!(result.table.value(0, "externalParameter"), "Q1");
        assert_eq!(result.table.value(0, "fout"), "parameter mismatch");
        assert_eq!(result.table.value(1, "fout"), "pars niet opgenomen in config");
    }

    #[test]
    fn test_mapping_accepts_any_candidate() {
        let mut builder = ModelBuilder::happy();
        builder.kunstwerken.push(entry("1000", "HK1", "KW100011", "Hk.0"));
        let result = check_parameter_mismatch(&builder.build());
        assert!(result.table.is_empty());
    }
}
