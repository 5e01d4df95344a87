//! Precompiled pattern tables.
//!
//! The allow-lists and mappings in `RulesConfig` are compiled once per run
//! and shared by the checks that use them.

use super::{MptConfig, ParameterMapping, SectionKind};
use regex::Regex;
use std::collections::HashMap;

/// Compile `pattern` anchored at the start of the subject.
///
/// Patterns keep their own `$` when they need a full match, so `HR.$`
/// accepts `HR1` but not `HR12`, while `WR` accepts anything starting with `WR`.
pub fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Allow-list that always applies to sub-locs: the stuurpeil series.
pub const SUB_BASE_PATTERNS: &[&str] = &["HR.$"];

/// Allow-list for hoofd-locs.
pub const HOOFD_PATTERNS: &[&str] = &["HS.$", "QR.$", "QS.$", "WR", "WS"];

/// A compiled parameter mapping pair.
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    /// `internal` prefix followed by a digit
    pub internal: Regex,
    pub external: Regex,
    pub source: ParameterMapping,
}

/// All pattern tables, compiled.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    sub_base: Vec<Regex>,
    hoofd: Vec<Regex>,
    by_type: HashMap<String, Vec<Regex>>,
    mapping: Vec<CompiledMapping>,
    sections: HashMap<SectionKind, Regex>,
}

impl CompiledRules {
    /// Compile every pattern in the config. Errors are collected, not
    /// short-circuited, so a config with several typos reports all of them.
    pub fn compile(config: &MptConfig) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();
        let mut compile = |pattern: &str, origin: &str| match anchored(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                errors.push(format!("{origin}: invalid pattern '{pattern}': {e}"));
                None
            }
        };

        let sub_base = SUB_BASE_PATTERNS
            .iter()
            .filter_map(|p| compile(p, "sub-loc base"))
            .collect();
        let hoofd = HOOFD_PATTERNS
            .iter()
            .filter_map(|p| compile(p, "hoofd-loc"))
            .collect();

        let mut by_type = HashMap::new();
        for (kind, patterns) in &config.rules.external_parameters_allowed {
            let origin = format!("rules.external_parameters_allowed.{kind}");
            let compiled = patterns
                .iter()
                .filter_map(|p| compile(p, &origin))
                .collect();
            by_type.insert(kind.to_lowercase(), compiled);
        }

        let mut mapping = Vec::new();
        for m in &config.rules.parameter_mapping {
            let internal = compile(&format!("{}\\d", m.internal), "rules.parameter_mapping");
            let external = compile(&m.external, "rules.parameter_mapping");
            if let (Some(internal), Some(external)) = (internal, external) {
                mapping.push(CompiledMapping {
                    internal,
                    external,
                    source: m.clone(),
                });
            }
        }

        for rule in config
            .rules
            .validation
            .hoofd
            .iter()
            .chain(&config.rules.validation.sub)
            .chain(&config.rules.validation.waterstand)
        {
            compile(&rule.parameter, "rules.validation");
        }

        let mut sections = HashMap::new();
        for kind in [
            SectionKind::Kunstwerken,
            SectionKind::Waterstandlocaties,
            SectionKind::Mswlocaties,
        ] {
            if let Some(re) = compile(kind.internal_location_pattern(), "idmap.sections") {
                sections.insert(kind, re);
            }
        }

        if errors.is_empty() {
            Ok(Self {
                sub_base,
                hoofd,
                by_type,
                mapping,
                sections,
            })
        } else {
            Err(errors)
        }
    }

    /// Allow-list for a sub-loc: `HR.$` plus the patterns of each type.
    /// Unknown types contribute nothing.
    pub fn sub_patterns<'a, I>(&'a self, types: I) -> Vec<&'a Regex>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut patterns: Vec<&Regex> = self.sub_base.iter().collect();
        for t in types {
            if let Some(list) = self.by_type.get(&t.to_lowercase()) {
                patterns.extend(list.iter());
            }
        }
        patterns
    }

    pub fn hoofd_patterns(&self) -> &[Regex] {
        &self.hoofd
    }

    pub fn mappings(&self) -> &[CompiledMapping] {
        &self.mapping
    }

    pub fn section_pattern(&self, kind: SectionKind) -> Option<&Regex> {
        self.sections.get(&kind)
    }
}
