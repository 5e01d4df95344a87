//! Fused model
//!
//! Owns every table the checks read: the five location sets, the id-map
//! files, the parameter catalogue, the hist-tag inventory and the ignore
//! lists. Derived indices (`hist_to_intloc`, the expanded hist tags,
//! `mpt_table`, the main id-map index) are computed once at construction.
//! Nothing mutates the model after that; checks get `&MptModel`.

mod histtags;
mod ignore;
#[cfg(test)]
pub mod fixture;

pub use histtags::{
    build_mpt_table, expand, hist_to_intloc, histtags_from_table, mpt_sheet, read_histtags,
    ExpandedHistTag, MptRange, END_COLUMN, SERIE_COLUMN, START_COLUMN,
};
pub use ignore::{IgnoreLists, XyIgnore, EXTERNAL_LOCATION, INTERNAL_LOCATION, UNKNOWN_SERIE};

use crate::config::{CompiledRules, MptConfig, SectionKind};
use crate::fews::{FewsConfig, IdMapFile, LoadError, LocationSet, Parameter};
use crate::types::{HistTag, IdMapEntry, LocationClass, Table};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Everything the model is built from.
#[derive(Debug, Clone)]
pub struct ModelParts {
    pub hoofd: LocationSet,
    pub sub: LocationSet,
    pub waterstand: LocationSet,
    pub msw: LocationSet,
    pub peilschaal: LocationSet,
    /// In `idmap.files` order
    pub idmaps: Vec<IdMapFile>,
    pub parameters: BTreeMap<String, Parameter>,
    pub histtags: Vec<HistTag>,
    pub ignore: IgnoreLists,
}

#[derive(Debug, Clone)]
pub struct MptModel {
    pub config: MptConfig,
    pub rules: CompiledRules,
    pub hoofd: LocationSet,
    pub sub: LocationSet,
    pub waterstand: LocationSet,
    pub msw: LocationSet,
    pub peilschaal: LocationSet,
    pub idmaps: Vec<IdMapFile>,
    pub parameters: BTreeMap<String, Parameter>,
    pub histtags: Vec<HistTag>,
    pub ignore: IgnoreLists,
    hist_to_intloc: BTreeMap<String, Vec<String>>,
    expanded: Vec<ExpandedHistTag>,
    mpt: BTreeMap<String, MptRange>,
    /// internal location → entry positions in the main id-map file
    main_index: BTreeMap<String, Vec<usize>>,
}

impl MptModel {
    /// Read every input named by `config`.
    pub fn load(config: &MptConfig, rules: CompiledRules) -> Result<Self, LoadError> {
        let fews = FewsConfig::open(&config.paths.fews_config)?;
        let sets = &config.location_sets;
        let parts = ModelParts {
            hoofd: fews.location_set(&sets.hoofd)?,
            sub: fews.location_set(&sets.sub)?,
            waterstand: fews.location_set(&sets.waterstand)?,
            msw: fews.location_set(&sets.msw)?,
            peilschaal: fews.location_set(&sets.peilschaal)?,
            idmaps: config
                .idmap
                .files
                .iter()
                .map(|f| fews.idmap(f))
                .collect::<Result<_, _>>()?,
            parameters: fews.parameter_catalogue()?,
            histtags: read_histtags(&config.paths.histtags_csv)?,
            ignore: IgnoreLists::load(&config.paths)?,
        };
        Ok(Self::new(config.clone(), rules, parts))
    }

    pub fn new(config: MptConfig, rules: CompiledRules, parts: ModelParts) -> Self {
        let join = hist_to_intloc(
            &parts.histtags,
            parts.idmaps.iter().flat_map(|f| f.entries.iter()),
        );
        let expanded = expand(&parts.histtags, &join);
        let mpt = build_mpt_table(&expanded);

        let mut main_index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        if let Some(main) = parts.idmaps.iter().find(|f| f.name == config.idmap.main_file) {
            for (i, entry) in main.entries.iter().enumerate() {
                main_index
                    .entry(entry.internal_location.clone())
                    .or_default()
                    .push(i);
            }
        }

        info!(
            hoofd = parts.hoofd.len(),
            sub = parts.sub.len(),
            waterstand = parts.waterstand.len(),
            msw = parts.msw.len(),
            peilschaal = parts.peilschaal.len(),
            histtags = parts.histtags.len(),
            mpt = mpt.len(),
            "Fused model built"
        );

        Self {
            config,
            rules,
            hoofd: parts.hoofd,
            sub: parts.sub,
            waterstand: parts.waterstand,
            msw: parts.msw,
            peilschaal: parts.peilschaal,
            idmaps: parts.idmaps,
            parameters: parts.parameters,
            histtags: parts.histtags,
            ignore: parts.ignore,
            hist_to_intloc: join,
            expanded,
            mpt,
            main_index,
        }
    }

    // ------------------------------------------------------------------------
    // Id-maps
    // ------------------------------------------------------------------------

    pub fn idmap(&self, name: &str) -> Option<&IdMapFile> {
        self.idmaps.iter().find(|f| f.name == name)
    }

    pub fn main_idmap(&self) -> Option<&IdMapFile> {
        self.idmap(&self.config.idmap.main_file)
    }

    pub fn main_entries(&self) -> &[IdMapEntry] {
        match self.main_idmap() {
            Some(f) => &f.entries,
            None => &[],
        }
    }

    /// Main id-map entries of one internal location, in file order.
    pub fn main_entries_for(&self, int_loc: &str) -> Vec<&IdMapEntry> {
        let entries = self.main_entries();
        self.main_index
            .get(int_loc)
            .map(|idx| idx.iter().map(|&i| &entries[i]).collect())
            .unwrap_or_default()
    }

    /// Internal locations of the main id-map, sorted.
    pub fn main_internal_locations(&self) -> impl Iterator<Item = &str> {
        self.main_index.keys().map(String::as_str)
    }

    /// Internal locations mapped in the main file's sections of `kind`.
    pub fn main_section_locations(&self, kind: SectionKind) -> HashSet<&str> {
        let mut locs = HashSet::new();
        if let Some(main) = self.main_idmap() {
            for rule in self.config.idmap.sections_of(&main.name, kind) {
                for entry in main.section(rule.start.as_deref(), rule.end.as_deref()) {
                    locs.insert(entry.internal_location.as_str());
                }
            }
        }
        locs
    }

    // ------------------------------------------------------------------------
    // Hist tags
    // ------------------------------------------------------------------------

    pub fn hist_to_intloc(&self) -> &BTreeMap<String, Vec<String>> {
        &self.hist_to_intloc
    }

    pub fn expanded_histtags(&self) -> &[ExpandedHistTag] {
        &self.expanded
    }

    pub fn mpt(&self) -> &BTreeMap<String, MptRange> {
        &self.mpt
    }

    pub fn mpt_sheet(&self) -> Table {
        mpt_sheet(&self.mpt)
    }

    // ------------------------------------------------------------------------
    // Locations
    // ------------------------------------------------------------------------

    /// Class by table membership, checked hoofd, sub, waterstand, msw.
    pub fn classify(&self, loc_id: &str) -> LocationClass {
        if self.hoofd.contains(loc_id) {
            LocationClass::Hoofd
        } else if self.sub.contains(loc_id) {
            LocationClass::Sub
        } else if self.waterstand.contains(loc_id) {
            LocationClass::Waterstand
        } else if self.msw.contains(loc_id) {
            LocationClass::Msw
        } else {
            LocationClass::Unknown
        }
    }

    /// Lowercased types of a sub-loc: `ALLE_TYPES` split on `/`, or `TYPE`
    /// when that is empty.
    pub fn sub_types(&self, loc_id: &str) -> Vec<String> {
        let Some(row) = self.sub.get(loc_id) else {
            return Vec::new();
        };
        let all = row.value("ALLE_TYPES");
        let source = if all.trim().is_empty() {
            row.value("TYPE")
        } else {
            all
        };
        source
            .split('/')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
