//! Validation thresholds on the location sets.
//!
//! A location needs the attributes of every rule whose parameter pattern
//! matches one of its internal parameters. Attributes it needs but lacks are
//! `missend`, attributes it carries without needing them are `overbodig`,
//! and the extremes of each applicable rule must be ordered
//! `hmin <= smin < smax <= hmax`.

use super::{CheckResult, VALIDATION_ERROR};
use crate::config::{anchored, ValidationRule};
use crate::fews::LocationSet;
use crate::model::MptModel;
use crate::types::{Row, Table};
use regex::Regex;
use std::collections::BTreeSet;

struct Rule<'a> {
    rule: &'a ValidationRule,
    pattern: Regex,
}

fn compile(rules: &[ValidationRule]) -> Vec<Rule<'_>> {
    rules
        .iter()
        .filter_map(|rule| {
            anchored(&rule.parameter)
                .ok()
                .map(|pattern| Rule { rule, pattern })
        })
        .collect()
}

fn number(row: &Row<'_>, attribute: &str) -> Option<f64> {
    row.get(attribute).and_then(|v| v.trim().parse::<f64>().ok())
}

/// Ordering violations of one rule, described by attribute names.
fn value_errors(row: &Row<'_>, rule: &ValidationRule) -> Vec<String> {
    let mut errors = Vec::new();
    let hmax = number(row, &rule.hmax);
    let hmin = number(row, &rule.hmin);
    if let (Some(max), Some(min)) = (hmax, hmin) {
        if max < min {
            errors.push(format!("{} < {}", rule.hmax, rule.hmin));
        }
    }

    let smax = rule.smax.as_ref().map(|t| t.attributes()).unwrap_or_default();
    let smin = rule.smin.as_ref().map(|t| t.attributes()).unwrap_or_default();
    for (_, attr) in &smax {
        if let (Some(max), Some(soft)) = (hmax, number(row, attr)) {
            if max < soft {
                errors.push(format!("{} < {}", rule.hmax, attr));
            }
        }
    }
    for (_, attr) in &smin {
        if let (Some(min), Some(soft)) = (hmin, number(row, attr)) {
            if soft < min {
                errors.push(format!("{} < {}", attr, rule.hmin));
            }
        }
    }
    for (period, max_attr) in &smax {
        let Some((_, min_attr)) = smin.iter().find(|(p, _)| p == period) else {
            continue;
        };
        if let (Some(max), Some(min)) = (number(row, max_attr), number(row, min_attr)) {
            if max <= min {
                errors.push(format!("{max_attr} <= {min_attr}"));
            }
        }
    }
    errors
}

fn check_set(
    out: &mut Table,
    model: &MptModel,
    set: &LocationSet,
    rules: &[ValidationRule],
    typed: bool,
) {
    let compiled = compile(rules);
    let universe: BTreeSet<&str> = rules
        .iter()
        .flat_map(ValidationRule::attribute_names)
        .collect();

    for row in set.table.rows() {
        let loc_id = row.value(&set.meta.id_column);
        let mut int_pars: Vec<&str> = Vec::new();
        for entry in model.main_entries_for(loc_id) {
            if !int_pars.contains(&entry.internal_parameter.as_str()) {
                int_pars.push(entry.internal_parameter.as_str());
            }
        }
        let loc_type = row.value("TYPE").to_lowercase();

        let applicable: Vec<&ValidationRule> = compiled
            .iter()
            .filter(|r| int_pars.iter().any(|p| r.pattern.is_match(p)))
            .filter(|r| match (&r.rule.location_type, typed) {
                (Some(t), true) => t.to_lowercase() == loc_type,
                (Some(_), false) => false,
                (None, _) => true,
            })
            .map(|r| r.rule)
            .collect();
        let required: BTreeSet<&str> = applicable
            .iter()
            .flat_map(|r| r.attribute_names())
            .collect();

        let missend: Vec<&str> = required
            .iter()
            .copied()
            .filter(|a| row.get(a).map_or(true, |v| v.trim().is_empty()))
            .collect();
        let overbodig: Vec<&str> = universe
            .iter()
            .copied()
            .filter(|a| !required.contains(a))
            .filter(|a| row.get(a).is_some_and(|v| !v.trim().is_empty()))
            .collect();

        let mut findings: Vec<(&str, String)> = Vec::new();
        if !missend.is_empty() {
            findings.push(("missend", missend.join(",")));
        }
        if !overbodig.is_empty() {
            findings.push(("overbodig", overbodig.join(",")));
        }
        for rule in &applicable {
            for description in value_errors(&row, rule) {
                findings.push(("waarde", description));
            }
        }

        for (fout_type, description) in findings {
            out.push_row(vec![
                loc_id.to_string(),
                row.value("START").to_string(),
                row.value("EIND").to_string(),
                int_pars.join(","),
                fout_type.to_string(),
                description,
            ]);
        }
    }
}

pub fn check_validation_rules(model: &MptModel) -> CheckResult {
    let mut table = Table::new(&[
        "internalLocation",
        "start",
        "eind",
        "internalParameters",
        "fout_type",
        "fout_beschrijving",
    ]);
    let rules = &model.config.rules.validation;
    check_set(&mut table, model, &model.hoofd, &rules.hoofd, false);
    check_set(&mut table, model, &model.sub, &rules.sub, true);
    check_set(&mut table, model, &model.waterstand, &rules.waterstand, false);
    table.dedup();
    CheckResult::new(VALIDATION_ERROR, table)
}
