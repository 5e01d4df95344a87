//! Built-in defaults for the run configuration.
//!
//! These reproduce the constants table the tool ships with: input paths,
//! location-set ids, id-map files and their comment sections, and the rule
//! tables used by the checks. Every value can be overridden from TOML.

use super::{ParameterMapping, SectionKind, SectionRule, Threshold, ValidationRule};
use std::collections::BTreeMap;

// ============================================================================
// Paths
// ============================================================================

pub const FEWS_CONFIG_DIR: &str = "data/input/FEWS_SA/config";
pub const HISTTAGS_CSV: &str = "data/input/get_series_startenddate_CAW_summary_total_sorted.csv";
pub const CONSISTENCY_INPUT_XLSX: &str = "data/input/consistency_input.xlsx";
pub const OUTPUT_DIR: &str = "data/output";
pub const IGNORED_HISTTAG_CSV: &str = "data/input/ignored_histtag.csv";
pub const IGNORED_EXLOC_CSV: &str = "data/input/ignored_exloc.csv";
pub const IGNORED_TS800_CSV: &str = "data/input/ignored_ts800.csv";
pub const IGNORED_XY_CSV: &str = "data/input/ignored_xy.csv";

/// Name of the workbook written into the output directory.
pub const OUTPUT_XLSX: &str = "consistency_output.xlsx";

/// Table-of-contents sheet in the input workbook (sheet name, description).
pub const TOC_SHEET: &str = "inhoudsopgave";

/// Minimum column width in report sheets.
pub const MIN_COLUMN_WIDTH: f64 = 20.0;

// ============================================================================
// FEWS configuration layout
// ============================================================================

pub const IDMAP_FOLDER: &str = "IdMapFiles";
pub const REGION_CONFIG_FOLDER: &str = "RegionConfigFiles";
pub const MAP_LAYER_FOLDER: &str = "MapLayerFiles";

pub const LOCATION_SETS_FILE: &str = "LocationSets";
pub const PARAMETERS_FILE: &str = "Parameters";

pub const HOOFD_LOCATION_SET: &str = "OPVLWATER_HOOFDLOC";
pub const SUB_LOCATION_SET: &str = "OPVLWATER_SUBLOC";
pub const WATERSTAND_LOCATION_SET: &str = "OPVLWATER_WATERSTANDEN_AUTO";
pub const MSW_LOCATION_SET: &str = "MSW_STATIONS";
pub const PEILSCHAAL_LOCATION_SET: &str = "OPVLWATER_PEILSCHALEN";

pub const MAIN_IDMAP_FILE: &str = "IdOPVLWATER";

pub fn idmap_files() -> Vec<String> {
    [
        "IdOPVLWATER",
        "IdOPVLWATER_HYMOS",
        "IdHDSR_NSC",
        "IdOPVLWATER_WQ",
        "IdGrondwaterCAW",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

pub fn idmap_sections() -> Vec<SectionRule> {
    let rule = |file: &str, kind, start: Option<&str>, end: Option<&str>| SectionRule {
        file: file.to_string(),
        kind,
        start: start.map(ToString::to_string),
        end: end.map(ToString::to_string),
    };
    vec![
        rule(
            "IdOPVLWATER",
            SectionKind::Kunstwerken,
            Some("<!--KUNSTWERK SUBLOCS (old CAW id)-->"),
            Some("<!--WATERSTANDSLOCATIES (old CAW id)-->"),
        ),
        rule(
            "IdOPVLWATER",
            SectionKind::Kunstwerken,
            Some("<!--KUNSTWERK SUBLOCS (new CAW id)-->"),
            Some("<!--WATERSTANDSLOCATIES (new CAW id)-->"),
        ),
        rule(
            "IdOPVLWATER",
            SectionKind::Waterstandlocaties,
            Some("<!--WATERSTANDSLOCATIES (old CAW id)-->"),
            Some("<!--MSW (old CAW id)-->"),
        ),
        rule(
            "IdOPVLWATER",
            SectionKind::Waterstandlocaties,
            Some("<!--WATERSTANDSLOCATIES (new CAW id)-->"),
            Some("<!--MSW (new CAW id)-->"),
        ),
        rule(
            "IdOPVLWATER",
            SectionKind::Mswlocaties,
            Some("<!--MSW (new CAW id)-->"),
            None,
        ),
        rule(
            "IdOPVLWATER_HYMOS",
            SectionKind::Kunstwerken,
            None,
            Some("<!--WATERSTANDSLOCATIES-->"),
        ),
        rule(
            "IdOPVLWATER_HYMOS",
            SectionKind::Waterstandlocaties,
            Some("<!--WATERSTANDSLOCATIES-->"),
            Some("<!--OVERIG-->"),
        ),
    ]
}

// ============================================================================
// Rule tables
// ============================================================================

/// Allowed external-parameter patterns per sub-loc type.
pub fn external_parameters_allowed() -> BTreeMap<String, Vec<String>> {
    let pompvijzel = [
        "FQ.$", "I.B$", "IB.$", "I.H$", "IH.$", "I.L$", "IL.$", "Q.$", "TT.$",
    ];
    let table: &[(&str, &[&str])] = &[
        ("pomp", &pompvijzel),
        ("vijzel", &pompvijzel),
        ("pompvijzel", &pompvijzel),
        ("stuw", &["SW.$", "Q.$", "ES.$"]),
        ("schuif", &["ES.$", "SP.$", "SS.$", "Q.$", "SM.$"]),
        ("afsluiter", &["ES.$"]),
        ("debietmeter", &["Q.$"]),
        ("vispassage", &["ES.$", "SP.$", "SS.$", "Q.$"]),
        ("krooshek", &["HB.$", "HO.$"]),
        ("totaal", &["Q.$"]),
        ("overlaat", &["Q.$", "SW.$"]),
    ];
    table
        .iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(ToString::to_string).collect()))
        .collect()
}

/// Internal-parameter prefix to external-parameter prefix pairs.
pub fn parameter_mapping() -> Vec<ParameterMapping> {
    [
        ("DD.", "I.B"),
        ("DDH.", "I.H"),
        ("DDL.", "I.L"),
        ("F.", "FR."),
        ("Hk.", "HK."),
        ("Hk.", "SW."),
        ("Hh.", "SS."),
        ("Hh.", "SP."),
        ("Hh.", "SM."),
        ("H.R.", "HR."),
        ("H.S.", "HS."),
        ("H.G.", "HG."),
        ("H.G.", "HB."),
        ("H.G.", "HO."),
        ("IB.", "IB."),
        ("IH.", "IH."),
        ("IL.", "IL."),
        ("POS.", "ES."),
        ("Q.G.", "Q."),
        ("Q.G.", "FQ."),
        ("Q.B.", "QR."),
        ("Q.S.", "QS."),
        ("TT.", "TT."),
        ("WR.", "WR"),
        ("WS.", "WS"),
    ]
    .iter()
    .map(|(internal, external)| ParameterMapping {
        internal: internal.to_string(),
        external: external.to_string(),
    })
    .collect()
}

fn extremes(parameter: &str, kind: Option<&str>, hmax: &str, hmin: &str) -> ValidationRule {
    ValidationRule {
        parameter: parameter.to_string(),
        location_type: kind.map(ToString::to_string),
        hmax: hmax.to_string(),
        smax: None,
        smin: None,
        hmin: hmin.to_string(),
    }
}

pub fn hoofd_validation_rules() -> Vec<ValidationRule> {
    vec![extremes("H.S.", None, "HS1_HMAX", "HS1_HMIN")]
}

pub fn sub_validation_rules() -> Vec<ValidationRule> {
    vec![
        extremes("H.R.", None, "HR1_HMAX", "HR1_HMIN"),
        extremes("H.S.", None, "HS1_HMAX", "HS1_HMIN"),
        extremes("Hk.", None, "HK_HMAX", "HK_HMIN"),
        extremes("Hh.", Some("schuif"), "HH_HMAX", "HH_HMIN"),
        extremes("Q.", Some("pomp"), "Q_HMAX", "Q_HMIN"),
    ]
}

pub fn waterstand_validation_rules() -> Vec<ValidationRule> {
    let periods = |attrs: [&str; 3]| {
        Threshold::Periods(
            attrs
                .iter()
                .enumerate()
                .map(|(i, a)| super::PeriodAttribute {
                    period: i as u8 + 1,
                    attribute: a.to_string(),
                })
                .collect(),
        )
    };
    vec![ValidationRule {
        parameter: "H.G.".to_string(),
        location_type: None,
        hmax: "HARDMAX".to_string(),
        smax: Some(periods(["WIN_SMAX", "OV_SMAX", "ZOM_SMAX"])),
        smin: Some(periods(["WIN_SMIN", "OV_SMIN", "ZOM_SMIN"])),
        hmin: "HARDMIN".to_string(),
    }]
}

// ============================================================================
// Regeneration
// ============================================================================

/// Look-back window before the newest hist-tag end date, in weeks.
pub const LOOKBACK_WEEKS: i64 = 26;

/// `EIND` written for locations still reporting data.
pub const OPEN_END_DATE: &str = "21000101";
