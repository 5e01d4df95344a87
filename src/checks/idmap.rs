//! Id-map file structure: section placement and duplicate entries.

use super::{CheckResult, IDMAP_DOUBLE, IDMAP_SECTION_ERROR};
use crate::model::MptModel;
use crate::types::{IdMapEntry, Table};
use std::collections::HashMap;
use tracing::debug;

/// Entries whose internal location does not fit the prefix of the section
/// they are listed in.
pub fn check_idmap_sections(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&[
        "bestand",
        "sectie",
        "externalLocation",
        "externalParameter",
        "internalLocation",
        "internalParameter",
    ]);

    for rule in &model.config.idmap.sections {
        let Some(file) = model.idmap(&rule.file) else {
            continue;
        };
        let Some(pattern) = model.rules.section_pattern(rule.kind) else {
            continue;
        };
        let section = file.section(rule.start.as_deref(), rule.end.as_deref());
        debug!(
            file = %rule.file,
            section = rule.kind.as_str(),
            entries = section.len(),
            "Checking id-map section"
        );
        for entry in section {
            if pattern.is_match(&entry.internal_location) {
                continue;
            }
            table.push_row(vec![
                rule.file.clone(),
                rule.start.clone().unwrap_or_default(),
                entry.external_location.clone(),
                entry.external_parameter.clone(),
                entry.internal_location.clone(),
                entry.internal_parameter.clone(),
            ]);
        }
    }
    CheckResult::new(IDMAP_SECTION_ERROR, table)
}

/// Entries occurring more than once in one file. Duplicates are collapsed on
/// external location: one row per external location, showing the last
/// duplicated entry seen for it.
pub fn check_double_idmaps(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&[
        "bestand",
        "internalLocation",
        "externalLocation",
        "internalParameter",
        "externalParameter",
    ]);

    for file in &model.idmaps {
        let mut counts: HashMap<&IdMapEntry, usize> = HashMap::new();
        for entry in &file.entries {
            *counts.entry(entry).or_default() += 1;
        }

        let mut order: Vec<&str> = Vec::new();
        let mut by_exloc: HashMap<&str, &IdMapEntry> = HashMap::new();
        for entry in file.entries.iter().filter(|e| counts[e] > 1) {
            let key = entry.external_location.as_str();
            if by_exloc.insert(key, entry).is_none() {
                order.push(key);
            }
        }

        for key in order {
            let entry = by_exloc[key];
            table.push_row(vec![
                file.name.clone(),
                entry.internal_location.clone(),
                entry.external_location.clone(),
                entry.internal_parameter.clone(),
                entry.external_parameter.clone(),
            ]);
        }
    }
    CheckResult::new(IDMAP_DOUBLE, table)
}
