//! Consistency checks
//!
//! Thirteen predicates over the fused model. Each returns a table with a
//! fixed column set; an empty table means the check passes. Checks run in a
//! fixed order and only read the model. The h-loc check additionally yields
//! a refreshed hoofd table when it finds nothing.

mod exloc;
mod expar;
mod histtags;
mod hloc;
mod idmap;
mod locset;
mod parameters;
mod timeseries;
mod validation;

pub use exloc::check_exloc;
pub use expar::{check_expar_errors, check_expar_missing};
pub use histtags::{check_ignored_histtags, check_missing_histtags};
pub use hloc::{check_hloc_consistency, HlocOutcome};
pub use idmap::{check_double_idmaps, check_idmap_sections};
pub use locset::check_location_sets;
pub use parameters::{check_missing_parameters, check_parameter_mismatch};
pub use timeseries::check_timeseries;
pub use validation::check_validation_rules;

use crate::model::MptModel;
use crate::types::Table;
use chrono::NaiveDate;
use tracing::{info, warn};

// ============================================================================
// Sheet names
// ============================================================================

pub const IDMAP_SECTION_ERROR: &str = "idmap sectie error";
pub const HISTTAG_MISSING: &str = "histTag ontbrekend";
pub const HISTTAG_IGNORE_MATCH: &str = "histTag ignore match";
pub const IDMAP_DOUBLE: &str = "idmap dubbel";
pub const PARAMETER_MISSING: &str = "par missend";
pub const HLOC_ERROR: &str = "hloc error";
pub const EXPAR_ERROR: &str = "exPar error";
pub const INTLOC_MISSING: &str = "intLoc missend";
pub const EXPAR_MISSING: &str = "exPar missend";
pub const EXLOC_ERROR: &str = "exLoc error";
pub const TIMESERIES_ERROR: &str = "timeSeries error";
pub const VALIDATION_ERROR: &str = "validatie error";
pub const PARAMETER_MISMATCH: &str = "par mismatch";
pub const LOCATION_SET_ERROR: &str = "locSet error";

/// Informational sheet with the observed period per internal location.
pub const MPT_SHEET: &str = "mpt";

/// Every check sheet in run order.
pub const CHECK_SHEETS: &[&str] = &[
    IDMAP_SECTION_ERROR,
    HISTTAG_MISSING,
    HISTTAG_IGNORE_MATCH,
    IDMAP_DOUBLE,
    PARAMETER_MISSING,
    HLOC_ERROR,
    EXPAR_ERROR,
    INTLOC_MISSING,
    EXPAR_MISSING,
    EXLOC_ERROR,
    TIMESERIES_ERROR,
    VALIDATION_ERROR,
    PARAMETER_MISMATCH,
    LOCATION_SET_ERROR,
];

/// Built-in sheet description, used when the input workbook has none.
pub fn describe(sheet: &str) -> &'static str {
    match sheet {
        IDMAP_SECTION_ERROR => "idmaps die in de verkeerde sectie van het idmap-bestand staan",
        HISTTAG_MISSING => "hist tags die niet in een idmap voorkomen",
        HISTTAG_IGNORE_MATCH => "genegeerde hist tags die wel in IdOPVLWATER voorkomen",
        IDMAP_DOUBLE => "dubbele idmaps binnen een idmap-bestand",
        PARAMETER_MISSING => "interne parameters die niet in Parameters.xml staan",
        HLOC_ERROR => "hoofdlocaties waarvan de sublocaties niet consistent zijn",
        EXPAR_ERROR => "externe parameters die niet bij het locatietype passen",
        INTLOC_MISSING => "interne locaties die in geen enkele locatieset staan",
        EXPAR_MISSING => "hoofdlocaties zonder verplichte externe parameters",
        EXLOC_ERROR => "externe locaties die niet bij de interne locatie passen",
        TIMESERIES_ERROR => "fouten in de koppeling van stuurpeilen aan sublocaties",
        VALIDATION_ERROR => "ontbrekende, overbodige of inconsistente validatiegrenzen",
        PARAMETER_MISMATCH => "interne en externe parameter komen niet overeen",
        LOCATION_SET_ERROR => "fouten in naamgeving en verwijzingen van locatiesets",
        MPT_SHEET => "start- en einddatum per meetpunt uit de hist tags",
        _ => "",
    }
}

/// Render a boolean flag the way the report shows it.
pub(crate) fn flag(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

// ============================================================================
// Results
// ============================================================================

/// Findings of one check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub sheet: &'static str,
    pub table: Table,
}

impl CheckResult {
    pub fn new(sheet: &'static str, table: Table) -> Self {
        Self { sheet, table }
    }

    pub fn count(&self) -> usize {
        self.table.len()
    }
}

/// All check results in run order plus the refreshed hoofd table.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
    /// Built from the sub-locs when the h-loc check found nothing
    pub new_hoofd: Option<Table>,
}

impl CheckReport {
    pub fn get(&self, sheet: &str) -> Option<&Table> {
        self.results
            .iter()
            .find(|r| r.sheet == sheet)
            .map(|r| &r.table)
    }

    pub fn count(&self, sheet: &str) -> usize {
        self.get(sheet).map_or(0, Table::len)
    }

    /// Total number of findings over every check.
    pub fn total(&self) -> usize {
        self.results.iter().map(CheckResult::count).sum()
    }

    fn push(&mut self, result: CheckResult) {
        if result.table.is_empty() {
            info!(check = result.sheet, "Check passed");
        } else {
            warn!(check = result.sheet, findings = result.count(), "Check found inconsistencies");
        }
        self.results.push(result);
    }
}

/// Run every check in order. `today` decides which sub-locs are still active.
pub fn run_all(model: &MptModel, today: NaiveDate) -> CheckReport {
    let mut report = CheckReport::default();

    report.push(check_idmap_sections(model));
    report.push(check_missing_histtags(model));
    report.push(check_ignored_histtags(model));
    report.push(check_double_idmaps(model));
    report.push(check_missing_parameters(model));

    let hloc = check_hloc_consistency(model);
    report.push(hloc.result);
    report.new_hoofd = hloc.new_hoofd;

    let (expar_errors, intloc_missing) = check_expar_errors(model);
    report.push(expar_errors);
    report.push(intloc_missing);
    report.push(check_expar_missing(model));
    report.push(check_exloc(model));
    report.push(check_timeseries(model, today));
    report.push(check_validation_rules(model));
    report.push(check_parameter_mismatch(model));
    report.push(check_location_sets(model));

    info!(
        checks = report.results.len(),
        findings = report.total(),
        new_hoofd = report.new_hoofd.is_some(),
        "All checks done"
    );
    report
}
