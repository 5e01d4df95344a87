//! Run configuration: input paths, location-set ids, id-map sections and the
//! rule tables behind the checks.
//!
//! Every section implements `Default` with the built-in constants from
//! `defaults.rs`, so an empty TOML file (or no file at all) reproduces the
//! standard run.

use super::defaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable pointing at a TOML run configuration.
pub const CONFIG_ENV_VAR: &str = "MPT_CONFIG";

/// File name searched for in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "mpt_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one consistency run.
///
/// Load with `MptConfig::load()` which searches:
/// 1. `$MPT_CONFIG` env var
/// 2. `./mpt_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MptConfig {
    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Location-set ids in `LocationSets.xml`
    #[serde(default)]
    pub location_sets: LocationSetIds,

    /// Id-map files and their commented sections
    #[serde(default)]
    pub idmap: IdMapConfig,

    /// Pattern tables used by the checks
    #[serde(default)]
    pub rules: RulesConfig,

    /// CSV regeneration settings
    #[serde(default)]
    pub regenerate: RegenerateConfig,

    /// Spreadsheet report settings
    #[serde(default)]
    pub report: ReportConfig,
}

impl MptConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MPT_CONFIG` environment variable
    /// 2. `./mpt_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded run config from MPT_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from MPT_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "MPT_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded run config from ./mpt_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./mpt_config.toml, using defaults");
                }
            }
        }

        info!("No mpt_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
                other => other,
            })?;
        Ok(config)
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Write the config to a file, e.g. to seed an operator-editable copy.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Run config saved");
        Ok(())
    }

    /// Validate the rule tables for internal consistency.
    ///
    /// Rules:
    /// - Every pattern must compile as a regex
    /// - The main id-map file must be one of the configured files
    /// - Sections may only refer to configured files
    /// - Look-back must be positive and the open end date a `YYYYMMDD` value
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = super::rules::CompiledRules::compile(self)
            .err()
            .unwrap_or_default();

        let (table_errors, table_warnings) = super::validation::validate_rule_tables(self);
        errors.extend(table_errors);
        for w in table_warnings {
            warn!("{}", w);
        }

        if !self.idmap.files.contains(&self.idmap.main_file) {
            errors.push(format!(
                "idmap.main_file '{}' is not listed in idmap.files",
                self.idmap.main_file
            ));
        }
        for section in &self.idmap.sections {
            if !self.idmap.files.contains(&section.file) {
                errors.push(format!(
                    "idmap.sections: file '{}' is not listed in idmap.files",
                    section.file
                ));
            }
        }
        if self.regenerate.lookback_weeks <= 0 {
            errors.push(format!(
                "regenerate.lookback_weeks = {} must be > 0",
                self.regenerate.lookback_weeks
            ));
        }
        if crate::types::dates::parse_yyyymmdd(&self.regenerate.open_end_date).is_none() {
            errors.push(format!(
                "regenerate.open_end_date '{}' is not a YYYYMMDD date",
                self.regenerate.open_end_date
            ));
        }
        if !self.report.min_column_width.is_finite() || self.report.min_column_width <= 0.0 {
            errors.push(format!(
                "report.min_column_width = {} must be a positive width",
                self.report.min_column_width
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Paths
// ============================================================================

/// Input files and the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the FEWS configuration
    #[serde(default = "default_fews_config")]
    pub fews_config: PathBuf,

    /// Hist-tag inventory CSV
    #[serde(default = "default_histtags_csv")]
    pub histtags_csv: PathBuf,

    /// Input workbook with the table of contents
    #[serde(default = "default_consistency_input_xlsx")]
    pub consistency_input_xlsx: PathBuf,

    /// Destination of the workbook and the regenerated CSVs
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_ignored_histtag")]
    pub ignored_histtag: PathBuf,

    #[serde(default = "default_ignored_exloc")]
    pub ignored_exloc: PathBuf,

    #[serde(default = "default_ignored_ts800")]
    pub ignored_ts800: PathBuf,

    #[serde(default = "default_ignored_xy")]
    pub ignored_xy: PathBuf,

    /// Optional JSON `{sheet: count}` to compare the summary against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_summary: Option<PathBuf>,
}

fn default_fews_config() -> PathBuf {
    PathBuf::from(defaults::FEWS_CONFIG_DIR)
}
fn default_histtags_csv() -> PathBuf {
    PathBuf::from(defaults::HISTTAGS_CSV)
}
fn default_consistency_input_xlsx() -> PathBuf {
    PathBuf::from(defaults::CONSISTENCY_INPUT_XLSX)
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(defaults::OUTPUT_DIR)
}
fn default_ignored_histtag() -> PathBuf {
    PathBuf::from(defaults::IGNORED_HISTTAG_CSV)
}
fn default_ignored_exloc() -> PathBuf {
    PathBuf::from(defaults::IGNORED_EXLOC_CSV)
}
fn default_ignored_ts800() -> PathBuf {
    PathBuf::from(defaults::IGNORED_TS800_CSV)
}
fn default_ignored_xy() -> PathBuf {
    PathBuf::from(defaults::IGNORED_XY_CSV)
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            fews_config: default_fews_config(),
            histtags_csv: default_histtags_csv(),
            consistency_input_xlsx: default_consistency_input_xlsx(),
            output_dir: default_output_dir(),
            ignored_histtag: default_ignored_histtag(),
            ignored_exloc: default_ignored_exloc(),
            ignored_ts800: default_ignored_ts800(),
            ignored_xy: default_ignored_xy(),
            expected_summary: None,
        }
    }
}

impl PathsConfig {
    /// Every input path with its role, for preflight checks.
    pub fn inputs(&self) -> Vec<(&'static str, &Path, bool)> {
        vec![
            ("fews_config", self.fews_config.as_path(), true),
            ("histtags_csv", self.histtags_csv.as_path(), false),
            ("consistency_input_xlsx", self.consistency_input_xlsx.as_path(), false),
            ("ignored_histtag", self.ignored_histtag.as_path(), false),
            ("ignored_exloc", self.ignored_exloc.as_path(), false),
            ("ignored_ts800", self.ignored_ts800.as_path(), false),
            ("ignored_xy", self.ignored_xy.as_path(), false),
        ]
    }
}

// ============================================================================
// Location Sets
// ============================================================================

/// Location-set ids as defined in `RegionConfigFiles/LocationSets.xml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSetIds {
    #[serde(default = "default_hoofd_set")]
    pub hoofd: String,
    #[serde(default = "default_sub_set")]
    pub sub: String,
    #[serde(default = "default_waterstand_set")]
    pub waterstand: String,
    #[serde(default = "default_msw_set")]
    pub msw: String,
    #[serde(default = "default_peilschaal_set")]
    pub peilschaal: String,
}

fn default_hoofd_set() -> String {
    defaults::HOOFD_LOCATION_SET.to_string()
}
fn default_sub_set() -> String {
    defaults::SUB_LOCATION_SET.to_string()
}
fn default_waterstand_set() -> String {
    defaults::WATERSTAND_LOCATION_SET.to_string()
}
fn default_msw_set() -> String {
    defaults::MSW_LOCATION_SET.to_string()
}
fn default_peilschaal_set() -> String {
    defaults::PEILSCHAAL_LOCATION_SET.to_string()
}

impl Default for LocationSetIds {
    fn default() -> Self {
        Self {
            hoofd: default_hoofd_set(),
            sub: default_sub_set(),
            waterstand: default_waterstand_set(),
            msw: default_msw_set(),
            peilschaal: default_peilschaal_set(),
        }
    }
}

// ============================================================================
// Id-map files and sections
// ============================================================================

/// Kind of commented section in an id-map file; decides the required prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Kunstwerken,
    Waterstandlocaties,
    Mswlocaties,
}

impl SectionKind {
    /// Pattern every internal location in the section must match.
    pub fn internal_location_pattern(self) -> &'static str {
        match self {
            Self::Kunstwerken => r"^KW\d{6}$",
            Self::Waterstandlocaties => r"^OW\d{6}$",
            Self::Mswlocaties => r"^(KW|OW)\d{6}$",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kunstwerken => "KUNSTWERKEN",
            Self::Waterstandlocaties => "WATERSTANDLOCATIES",
            Self::Mswlocaties => "MSWLOCATIES",
        }
    }
}

/// One commented section of an id-map file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRule {
    pub file: String,
    pub kind: SectionKind,
    /// Start marker, e.g. `<!--KUNSTWERK SUBLOCS (new CAW id)-->`; absent = file start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// End marker; absent = end of file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdMapConfig {
    /// Id-map file stems in `IdMapFiles`
    #[serde(default = "defaults::idmap_files")]
    pub files: Vec<String>,

    /// File whose mappings define the monitoring points
    #[serde(default = "default_main_idmap")]
    pub main_file: String,

    #[serde(default = "defaults::idmap_sections")]
    pub sections: Vec<SectionRule>,
}

fn default_main_idmap() -> String {
    defaults::MAIN_IDMAP_FILE.to_string()
}

impl Default for IdMapConfig {
    fn default() -> Self {
        Self {
            files: defaults::idmap_files(),
            main_file: default_main_idmap(),
            sections: defaults::idmap_sections(),
        }
    }
}

impl IdMapConfig {
    /// Sections of one kind in one file.
    pub fn sections_of<'a>(
        &'a self,
        file: &'a str,
        kind: SectionKind,
    ) -> impl Iterator<Item = &'a SectionRule> + 'a {
        self.sections
            .iter()
            .filter(move |s| s.file == file && s.kind == kind)
    }
}

// ============================================================================
// Rule tables
// ============================================================================

/// Internal-to-external parameter prefix pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    pub internal: String,
    pub external: String,
}

/// Threshold attribute for one seasonal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAttribute {
    pub period: u8,
    pub attribute: String,
}

/// A soft threshold: one attribute, or one attribute per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Single(String),
    Periods(Vec<PeriodAttribute>),
}

impl Threshold {
    /// `(period, attribute)` pairs; a single attribute applies to every period.
    pub fn attributes(&self) -> Vec<(Option<u8>, &str)> {
        match self {
            Self::Single(a) => vec![(None, a.as_str())],
            Self::Periods(p) => p
                .iter()
                .map(|p| (Some(p.period), p.attribute.as_str()))
                .collect(),
        }
    }
}

/// Extreme-value rule for locations carrying a matching internal parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Internal-parameter pattern, matched from the start
    pub parameter: String,
    /// Only applies to sub-locs of this `TYPE`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    pub hmax: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smax: Option<Threshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smin: Option<Threshold>,
    pub hmin: String,
}

impl ValidationRule {
    /// Every attribute name the rule refers to, in `hmax, smax, smin, hmin` order.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names = vec![self.hmax.as_str()];
        for t in [&self.smax, &self.smin].into_iter().flatten() {
            names.extend(t.attributes().into_iter().map(|(_, a)| a));
        }
        names.push(self.hmin.as_str());
        names
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRulesConfig {
    #[serde(default = "defaults::hoofd_validation_rules")]
    pub hoofd: Vec<ValidationRule>,
    #[serde(default = "defaults::sub_validation_rules")]
    pub sub: Vec<ValidationRule>,
    #[serde(default = "defaults::waterstand_validation_rules")]
    pub waterstand: Vec<ValidationRule>,
}

impl Default for ValidationRulesConfig {
    fn default() -> Self {
        Self {
            hoofd: defaults::hoofd_validation_rules(),
            sub: defaults::sub_validation_rules(),
            waterstand: defaults::waterstand_validation_rules(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Sub-loc type → external-parameter patterns
    #[serde(default = "defaults::external_parameters_allowed")]
    pub external_parameters_allowed: BTreeMap<String, Vec<String>>,

    #[serde(default = "defaults::parameter_mapping")]
    pub parameter_mapping: Vec<ParameterMapping>,

    #[serde(default)]
    pub validation: ValidationRulesConfig,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            external_parameters_allowed: defaults::external_parameters_allowed(),
            parameter_mapping: defaults::parameter_mapping(),
            validation: ValidationRulesConfig::default(),
        }
    }
}

// ============================================================================
// Regeneration and report
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateConfig {
    /// Weeks before the newest hist-tag end that still count as "running"
    #[serde(default = "default_lookback_weeks")]
    pub lookback_weeks: i64,

    /// `EIND` value for running locations
    #[serde(default = "default_open_end_date")]
    pub open_end_date: String,
}

fn default_lookback_weeks() -> i64 {
    defaults::LOOKBACK_WEEKS
}
fn default_open_end_date() -> String {
    defaults::OPEN_END_DATE.to_string()
}

impl Default for RegenerateConfig {
    fn default() -> Self {
        Self {
            lookback_weeks: default_lookback_weeks(),
            open_end_date: default_open_end_date(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Workbook file name inside the output directory
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Table-of-contents sheet in the input workbook
    #[serde(default = "default_toc_sheet")]
    pub toc_sheet: String,

    #[serde(default = "default_min_column_width")]
    pub min_column_width: f64,
}

fn default_output_file() -> String {
    defaults::OUTPUT_XLSX.to_string()
}
fn default_toc_sheet() -> String {
    defaults::TOC_SHEET.to_string()
}
fn default_min_column_width() -> f64 {
    defaults::MIN_COLUMN_WIDTH
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            toc_sheet: default_toc_sheet(),
            min_column_width: default_min_column_width(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
