//! Config validation: unknown-key detection with Levenshtein suggestions
//! and rule-table sanity checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for MptConfig.
///
/// Maintained by hand to match the struct hierarchy in mpt_config.rs.
/// Arrays of tables (`idmap.sections`, `rules.parameter_mapping`, the
/// validation rule lists) are not walked, so only their parent key appears.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [paths]
        "paths",
        "paths.fews_config",
        "paths.histtags_csv",
        "paths.consistency_input_xlsx",
        "paths.output_dir",
        "paths.ignored_histtag",
        "paths.ignored_exloc",
        "paths.ignored_ts800",
        "paths.ignored_xy",
        "paths.expected_summary",
        // [location_sets]
        "location_sets",
        "location_sets.hoofd",
        "location_sets.sub",
        "location_sets.waterstand",
        "location_sets.msw",
        "location_sets.peilschaal",
        // [idmap]
        "idmap",
        "idmap.files",
        "idmap.main_file",
        "idmap.sections",
        // [rules]
        "rules",
        "rules.external_parameters_allowed",
        "rules.parameter_mapping",
        "rules.validation",
        "rules.validation.hoofd",
        "rules.validation.sub",
        "rules.validation.waterstand",
        // [regenerate]
        "regenerate",
        "regenerate.lookback_weeks",
        "regenerate.open_end_date",
        // [report]
        "report",
        "report.output_file",
        "report.toc_sheet",
        "report.min_column_width",
    ];
    keys.iter().copied().collect()
}

/// Tables whose keys are operator data rather than field names.
const OPEN_TABLES: &[&str] = &["rules.external_parameters_allowed"];

fn in_open_table(key: &str) -> bool {
    OPEN_TABLES
        .iter()
        .any(|t| key.len() > t.len() && key.starts_with(t) && key.as_bytes()[t.len()] == b'.')
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        // Ties resolve alphabetically so suggestions are stable across runs
        let better = match best {
            None => true,
            Some((bk, bd)) => dist < bd || (dist == bd && k < bk),
        };
        if better {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if known.contains(key.as_str()) || in_open_table(key) {
            continue;
        }
        let suggestion = suggest_correction(key, &known);
        warnings.push(ValidationWarning {
            field: key.clone(),
            message: format!("Unknown config key '{key}'"),
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Rule Table Validation
// ============================================================================

/// Sanity-check the rule tables on a parsed MptConfig.
///
/// Returns (errors, warnings): errors make a rule unusable; warnings flag
/// entries that can never fire.
pub fn validate_rule_tables(config: &super::MptConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let sets = [
        ("hoofd", &config.rules.validation.hoofd),
        ("sub", &config.rules.validation.sub),
        ("waterstand", &config.rules.validation.waterstand),
    ];
    for (set, rules) in sets {
        for (i, rule) in rules.iter().enumerate() {
            let field = format!("rules.validation.{set}[{i}]");
            if rule.attribute_names().iter().any(|a| a.trim().is_empty()) {
                errors.push(format!("{field}: empty threshold attribute name"));
            }
            for threshold in [&rule.smax, &rule.smin].into_iter().flatten() {
                for (period, attribute) in threshold.attributes() {
                    if let Some(p) = period {
                        if !(1..=3).contains(&p) {
                            errors.push(format!(
                                "{field}: period {p} of '{attribute}' must be 1, 2 or 3"
                            ));
                        }
                    }
                }
            }
            if let Some(kind) = &rule.location_type {
                if set != "sub" {
                    warnings.push(ValidationWarning {
                        field: field.clone(),
                        message: format!("{field}: type filter '{kind}' only applies to sub-locs"),
                        suggestion: None,
                    });
                } else if !config
                    .rules
                    .external_parameters_allowed
                    .contains_key(&kind.to_lowercase())
                {
                    warnings.push(ValidationWarning {
                        field: field.clone(),
                        message: format!("{field}: type '{kind}' has no external-parameter patterns"),
                        suggestion: None,
                    });
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for m in &config.rules.parameter_mapping {
        if !seen.insert((m.internal.as_str(), m.external.as_str())) {
            warnings.push(ValidationWarning {
                field: "rules.parameter_mapping".to_string(),
                message: format!(
                    "duplicate parameter mapping {} -> {}",
                    m.internal, m.external
                ),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MptConfig, PeriodAttribute, Threshold};

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("histags_csv", "histtags_csv"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [regenerate]
            lookback_weeks = 26
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"regenerate".to_string()));
        assert!(keys.contains(&"regenerate.lookback_weeks".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[paths]
histags_csv = "x.csv"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("histags_csv"));
        assert_eq!(warnings[0].suggestion.as_deref(), Some("paths.histtags_csv"));
    }

    #[test]
    fn test_open_table_keys_are_accepted() {
        let toml_str = r#"
[rules.external_parameters_allowed]
gemaal = ["Q.$"]
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "got {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[reprot]\noutput_file = \"x.xlsx\"\n");
        assert!(warnings.iter().any(|w| w.field == "reprot"));
        assert_eq!(warnings[0].suggestion.as_deref(), Some("report"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_rule_tables_defaults_clean() {
        let (errors, warnings) = validate_rule_tables(&MptConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_rule_tables_bad_period() {
        let mut config = MptConfig::default();
        config.rules.validation.waterstand[0].smax = Some(Threshold::Periods(vec![
            PeriodAttribute {
                period: 4,
                attribute: "X".to_string(),
            },
        ]));
        let (errors, _) = validate_rule_tables(&config);
        assert!(errors.iter().any(|e| e.contains("period 4")));
    }
}
