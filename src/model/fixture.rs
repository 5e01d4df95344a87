//! In-memory model builder for unit tests.
//!
//! `ModelBuilder::happy()` is one weir: hoofd `KW100010`, sub-loc `KW100011`
//! of type `stuw`, two main id-map entries, one hist tag. Every check comes
//! out empty on it; tests mutate it to provoke a single finding.

use super::{IgnoreLists, ModelParts, MptModel, EXTERNAL_LOCATION, INTERNAL_LOCATION, UNKNOWN_SERIE};
use crate::config::{CompiledRules, MptConfig};
use crate::fews::{IdMapContents, IdMapFile, LocationSet, Parameter};
use crate::types::dates::parse_datetime;
use crate::types::{HistTag, IdMapEntry, Table};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const KUNSTWERK_MARKER: &str = "<!--KUNSTWERK SUBLOCS (new CAW id)-->";
pub const WATERSTAND_MARKER: &str = "<!--WATERSTANDSLOCATIES (new CAW id)-->";
pub const MSW_MARKER: &str = "<!--MSW (new CAW id)-->";

const HOOFD_COLUMNS: &[&str] = &[
    "LOC_ID", "LOC_NAME", "X", "Y", "ALLE_TYPES", "START", "EIND", "SYSTEEM", "RAYON", "KOMPAS",
    "HS1_HMAX", "HS1_HMIN",
];
const SUB_COLUMNS: &[&str] = &[
    "LOC_ID", "LOC_NAME", "PAR_ID", "TYPE", "FUNCTIE", "ALLE_TYPES", "X", "Y", "START", "EIND",
    "SYSTEEM", "RAYON", "KOMPAS", "HBOV", "HBEN", "HBOVPS", "HBENPS", "HK_HMAX", "HK_HMIN",
];
const WATERSTAND_COLUMNS: &[&str] = &[
    "LOC_ID", "LOC_NAME", "X", "Y", "START", "EIND", "PEILSCHAAL", "HIST_TAG", "HARDMAX",
    "WIN_SMAX", "OV_SMAX", "ZOM_SMAX", "WIN_SMIN", "OV_SMIN", "ZOM_SMIN", "HARDMIN",
];
const PLAIN_COLUMNS: &[&str] = &["LOC_ID", "LOC_NAME", "X", "Y"];

/// Append a row given as `(column, value)` pairs; other cells stay empty.
pub fn push_named(table: &mut Table, values: &[(&str, &str)]) {
    let row = table
        .columns()
        .iter()
        .map(|c| {
            values
                .iter()
                .find(|(k, _)| k == c)
                .map_or(String::new(), |(_, v)| (*v).to_string())
        })
        .collect::<Vec<_>>();
    table.push_row(row);
}

pub fn entry(ex_loc: &str, ex_par: &str, int_loc: &str, int_par: &str) -> IdMapEntry {
    IdMapEntry::new(ex_loc, ex_par, int_loc, int_par)
}

pub fn tag(serie: &str, start: &str, end: &str) -> HistTag {
    HistTag::new(
        serie,
        parse_datetime(start).unwrap(),
        parse_datetime(end).unwrap(),
    )
}

pub struct ModelBuilder {
    pub config: MptConfig,
    pub hoofd: Table,
    pub sub: Table,
    pub waterstand: Table,
    pub msw: Table,
    pub peilschaal: Table,
    pub kunstwerken: Vec<IdMapEntry>,
    pub waterstanden: Vec<IdMapEntry>,
    pub msw_entries: Vec<IdMapEntry>,
    /// Entries of the other id-map files, by file name
    pub other_idmaps: BTreeMap<String, Vec<IdMapEntry>>,
    pub parameters: Vec<String>,
    pub histtags: Vec<HistTag>,
    pub ignored_histtag: Table,
    pub ignored_exloc: Table,
    pub ignored_ts800: Table,
    pub ignored_xy: Table,
}

impl ModelBuilder {
    pub fn happy() -> Self {
        let mut hoofd = Table::new(HOOFD_COLUMNS);
        push_named(
            &mut hoofd,
            &[
                ("LOC_ID", "KW100010"),
                ("LOC_NAME", "STUW1_1000-K_STUW1"),
                ("X", "140000"),
                ("Y", "450000"),
                ("ALLE_TYPES", "stuw"),
                ("START", "20200101"),
                ("EIND", "20201231"),
                ("SYSTEEM", "S1"),
                ("RAYON", "R1"),
                ("KOMPAS", "N"),
                ("HS1_HMAX", "2.0"),
                ("HS1_HMIN", "1.0"),
            ],
        );
        let mut sub = Table::new(SUB_COLUMNS);
        push_named(
            &mut sub,
            &[
                ("LOC_ID", "KW100011"),
                ("LOC_NAME", "STUW1_1000-K_STUW1-stuw1_sturing"),
                ("PAR_ID", "KW100010"),
                ("TYPE", "stuw"),
                ("FUNCTIE", "sturing"),
                ("ALLE_TYPES", "stuw"),
                ("X", "140000"),
                ("Y", "450000"),
                ("START", "20200101"),
                ("EIND", "20201231"),
                ("SYSTEEM", "S1"),
                ("RAYON", "R1"),
                ("KOMPAS", "N"),
                ("HK_HMAX", "1.5"),
                ("HK_HMIN", "0.5"),
            ],
        );
        let config = MptConfig::default();
        let other_idmaps = config
            .idmap
            .files
            .iter()
            .filter(|f| **f != config.idmap.main_file)
            .map(|f| (f.clone(), Vec::new()))
            .collect();

        Self {
            hoofd,
            sub,
            waterstand: Table::new(WATERSTAND_COLUMNS),
            msw: Table::new(PLAIN_COLUMNS),
            peilschaal: Table::new(PLAIN_COLUMNS),
            kunstwerken: vec![
                entry("1000", "HS1", "KW100010", "H.S.0"),
                entry("1000", "SW1", "KW100011", "Hk.0"),
            ],
            waterstanden: Vec::new(),
            msw_entries: Vec::new(),
            other_idmaps,
            parameters: vec!["H.S.0".to_string(), "Hk.0".to_string()],
            histtags: vec![tag("1000_HS1", "2020-01-01", "2020-12-31")],
            ignored_histtag: Table::new(&[UNKNOWN_SERIE]),
            ignored_exloc: Table::new(&[EXTERNAL_LOCATION, INTERNAL_LOCATION]),
            ignored_ts800: Table::new(&[EXTERNAL_LOCATION, INTERNAL_LOCATION]),
            ignored_xy: Table::new(&[INTERNAL_LOCATION, "x", "y"]),
            config,
        }
    }

    /// The main id-map file laid out in its three commented sections.
    fn main_idmap(&self) -> IdMapFile {
        let mut contents = IdMapContents::default();
        for (marker, entries) in [
            (KUNSTWERK_MARKER, &self.kunstwerken),
            (WATERSTAND_MARKER, &self.waterstanden),
            (MSW_MARKER, &self.msw_entries),
        ] {
            contents
                .markers
                .push((contents.entries.len(), marker.to_string()));
            contents.entries.extend(entries.iter().cloned());
        }
        let name = &self.config.idmap.main_file;
        IdMapFile::new(name, PathBuf::from(format!("{name}.xml")), contents)
    }

    pub fn build(self) -> MptModel {
        let mut idmaps = Vec::new();
        for file in &self.config.idmap.files {
            if *file == self.config.idmap.main_file {
                idmaps.push(self.main_idmap());
            } else {
                let contents = IdMapContents {
                    entries: self.other_idmaps.get(file).cloned().unwrap_or_default(),
                    markers: Vec::new(),
                };
                idmaps.push(IdMapFile::new(file, PathBuf::from(format!("{file}.xml")), contents));
            }
        }
        let parameters = self
            .parameters
            .iter()
            .map(|id| {
                (
                    id.clone(),
                    Parameter {
                        id: id.clone(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        let ignore = IgnoreLists::from_tables(
            self.ignored_histtag,
            self.ignored_exloc,
            self.ignored_ts800,
            self.ignored_xy,
            Path::new("ignored_xy.csv"),
        )
        .unwrap();
        let sets = &self.config.location_sets;
        let parts = ModelParts {
            hoofd: LocationSet::from_table(&sets.hoofd, "oppvlwater_hoofdloc", self.hoofd),
            sub: LocationSet::from_table(&sets.sub, "oppvlwater_subloc", self.sub),
            waterstand: LocationSet::from_table(
                &sets.waterstand,
                "oppvlwater_waterstanden",
                self.waterstand,
            ),
            msw: LocationSet::from_table(&sets.msw, "msw_stations", self.msw),
            peilschaal: LocationSet::from_table(
                &sets.peilschaal,
                "oppvlwater_peilschalen",
                self.peilschaal,
            ),
            idmaps,
            parameters,
            histtags: self.histtags,
            ignore,
        };
        let rules = CompiledRules::compile(&self.config).unwrap();
        MptModel::new(self.config, rules, parts)
    }
}
