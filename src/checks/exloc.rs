//! External location against the shape of the internal locations it feeds.

use super::{CheckResult, EXLOC_ERROR};
use crate::model::MptModel;
use crate::types::Table;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Internal-location prefixes grouped separately for 8-shaped externals.
const PREFIXES: [&str; 2] = ["KW", "OW"];

/// Shape of an external location id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `xxx`: internal location reads `...xxx..`
    Three,
    /// `xxxx`: internal location reads `..xxxx..`
    Four,
    /// `8..` or `.8..`: shared by several structures
    Eight,
    Other,
}

impl Shape {
    fn of(ex_loc: &str) -> Self {
        let bytes = ex_loc.as_bytes();
        match bytes.len() {
            3 if bytes[0] == b'8' => Self::Eight,
            4 if bytes[1] == b'8' => Self::Eight,
            3 => Self::Three,
            4 => Self::Four,
            _ => Self::Other,
        }
    }
}

/// Internal locations of an 8-shaped external that disagree on their first
/// six characters, per prefix.
fn eight_shape_errors<'a>(int_locs: &BTreeSet<&'a str>) -> Vec<&'a str> {
    let mut errors = Vec::new();
    for prefix in PREFIXES {
        let members: Vec<&str> = int_locs
            .iter()
            .copied()
            .filter(|l| l.starts_with(prefix))
            .collect();
        let heads: BTreeSet<&str> = members.iter().map(|&l| l.get(..6).unwrap_or(l)).collect();
        if heads.len() > 1 {
            errors.extend(members);
        }
    }
    errors
}

pub fn check_exloc(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&["internalLocation", "externalLocation"]);

    let mut groups: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for entry in model.main_entries() {
        groups
            .entry(entry.external_location.as_str())
            .or_default()
            .insert(entry.internal_location.as_str());
    }

    for (ex_loc, int_locs) in &groups {
        let escaped = regex::escape(ex_loc);
        let errors: Vec<&str> = match Shape::of(ex_loc) {
            Shape::Eight => eight_shape_errors(int_locs),
            shape @ (Shape::Three | Shape::Four) => {
                let lead = if shape == Shape::Three { "..." } else { ".." };
                match Regex::new(&format!("^{lead}{escaped}..$")) {
                    Ok(re) => int_locs.iter().copied().filter(|l| !re.is_match(l)).collect(),
                    Err(_) => Vec::new(),
                }
            }
            Shape::Other => {
                debug!(external_location = %ex_loc, "External location shape not checked");
                Vec::new()
            }
        };

        for int_loc in errors {
            if model.ignore.is_exloc_ignored(ex_loc, int_loc) {
                continue;
            }
            table.push_row(vec![int_loc, *ex_loc]);
        }
    }
    CheckResult::new(EXLOC_ERROR, table)
}
