//! FEWS configuration loader
//!
//! Indexes a FEWS configuration directory by folder and exposes the pieces
//! the consistency engine reads:
//!
//! - `location_set(id)`: CSV location table with attribute files joined
//! - `idmap(file)` / `idmaps(file, section)`: id-map entries, optionally
//!   restricted to a commented section
//! - `parameters(scope)`: parameter groups or individual parameters
//!
//! Files are read on demand; the index itself only records paths.

mod location_set;
pub mod csv_io;
pub mod xml;

pub use location_set::LocationSet;
pub use xml::{
    AttributeColumn, AttributeFileMeta, IdMapContents, LocationSetMeta, Parameter, ParameterGroup,
};

use crate::config::defaults::{
    IDMAP_FOLDER, LOCATION_SETS_FILE, MAP_LAYER_FOLDER, PARAMETERS_FILE, REGION_CONFIG_FOLDER,
};
use crate::types::IdMapEntry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal input errors. Every variant names the offending path or id.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Path not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error in {}: {source}", .path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: ::csv::Error,
    },

    #[error("Column '{column}' missing in {}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Location set '{id}' is not defined in {}", .path.display())]
    UnknownLocationSet { id: String, path: PathBuf },

    #[error("Unparseable date '{value}' in column {column} of {}", .path.display())]
    InvalidDate {
        path: PathBuf,
        column: String,
        value: String,
    },

    #[error("Invalid pattern '{pattern}' in {}: {source}", .path.display())]
    InvalidPattern {
        path: PathBuf,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// What `parameters()` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterScope {
    Groups,
    Parameters,
}

#[derive(Debug, Clone)]
pub enum ParameterView {
    Groups(BTreeMap<String, ParameterGroup>),
    Parameters(BTreeMap<String, Parameter>),
}

/// An id-map file with its comment markers.
#[derive(Debug, Clone)]
pub struct IdMapFile {
    pub name: String,
    pub path: PathBuf,
    pub entries: Vec<IdMapEntry>,
    markers: Vec<(usize, String)>,
}

impl IdMapFile {
    pub fn new(name: &str, path: PathBuf, contents: IdMapContents) -> Self {
        Self {
            name: name.to_string(),
            path,
            entries: contents.entries,
            markers: contents.markers,
        }
    }

    /// Entries between two comment markers. A missing `start` means file
    /// start and a missing `end` means end of file. A start marker that does
    /// not occur gives an empty section; an end marker that does not occur
    /// after the start runs to the end of the file.
    pub fn section(&self, start: Option<&str>, end: Option<&str>) -> &[IdMapEntry] {
        let from = match start {
            None => 0,
            Some(marker) => match self.markers.iter().find(|(_, m)| m == marker) {
                Some((pos, _)) => *pos,
                None => {
                    warn!(file = %self.name, marker, "Section start marker not found");
                    return &[];
                }
            },
        };
        let to = match end {
            None => self.entries.len(),
            Some(marker) => match self
                .markers
                .iter()
                .find(|(pos, m)| *pos >= from && m == marker)
            {
                Some((pos, _)) => *pos,
                None => {
                    debug!(file = %self.name, marker, "Section end marker not found, reading to end of file");
                    self.entries.len()
                }
            },
        };
        &self.entries[from..to.max(from)]
    }
}

/// Index of a FEWS configuration directory.
#[derive(Debug, Clone)]
pub struct FewsConfig {
    root: PathBuf,
    buckets: BTreeMap<String, BTreeMap<String, PathBuf>>,
    location_sets: Vec<LocationSetMeta>,
}

impl FewsConfig {
    /// Index `root` one level deep and parse `LocationSets.xml`.
    pub fn open(root: &Path) -> Result<Self, LoadError> {
        if !root.is_dir() {
            return Err(LoadError::Missing(root.to_path_buf()));
        }
        let buckets = index_directory(root)?;
        let mut config = Self {
            root: root.to_path_buf(),
            buckets,
            location_sets: Vec::new(),
        };
        let path = config.file(REGION_CONFIG_FOLDER, LOCATION_SETS_FILE)?.to_path_buf();
        let text = read_text(&path)?;
        config.location_sets = xml::parse_location_sets(&text)
            .map_err(|source| LoadError::Xml { path, source })?;
        info!(
            root = %root.display(),
            folders = config.buckets.len(),
            location_sets = config.location_sets.len(),
            "Indexed FEWS config"
        );
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files of one folder, by stem.
    pub fn bucket(&self, folder: &str) -> Option<&BTreeMap<String, PathBuf>> {
        self.buckets.get(folder)
    }

    /// Path of `folder/stem.*`.
    pub fn file(&self, folder: &str, stem: &str) -> Result<&Path, LoadError> {
        self.buckets
            .get(folder)
            .and_then(|b| b.get(stem))
            .map(PathBuf::as_path)
            .ok_or_else(|| LoadError::Missing(self.root.join(folder).join(stem)))
    }

    pub fn location_set_meta(&self, id: &str) -> Result<&LocationSetMeta, LoadError> {
        self.location_sets
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| LoadError::UnknownLocationSet {
                id: id.to_string(),
                path: self
                    .root
                    .join(REGION_CONFIG_FOLDER)
                    .join(format!("{LOCATION_SETS_FILE}.xml")),
            })
    }

    /// Load a location set with its attribute files joined.
    pub fn location_set(&self, id: &str) -> Result<LocationSet, LoadError> {
        let meta = self.location_set_meta(id)?.clone();
        let path = self.map_layer_csv(&meta.csv_file)?;
        let table = csv_io::read_table(&path, None)?;
        csv_io::require_columns(&table, &path, &[meta.id_column.as_str()])?;

        let attribute_files = meta.attribute_files.clone();
        let mut set = LocationSet::new(meta, path, table);
        for af in &attribute_files {
            let af_path = self.map_layer_csv(&af.csv_file)?;
            let attrs = csv_io::read_table(&af_path, None)?;
            let id_column = if af.id_column.is_empty() {
                "LOC_ID"
            } else {
                af.id_column.as_str()
            };
            csv_io::require_columns(&attrs, &af_path, &[id_column])?;
            set.join_attributes(&attrs, id_column);
        }
        if set.crs.is_none() {
            debug!(set = id, "No recognised geoDatum, geometry without CRS");
        }
        info!(set = id, rows = set.len(), attribute_files = attribute_files.len(), "Loaded location set");
        Ok(set)
    }

    /// Parse one id-map file by stem.
    pub fn idmap(&self, file_id: &str) -> Result<IdMapFile, LoadError> {
        let path = self.file(IDMAP_FOLDER, file_id)?.to_path_buf();
        let text = read_text(&path)?;
        let contents =
            xml::parse_idmap(&text).map_err(|source| LoadError::Xml { path: path.clone(), source })?;
        debug!(file = file_id, entries = contents.entries.len(), "Parsed id-map");
        Ok(IdMapFile::new(file_id, path, contents))
    }

    /// Entries of an id-map file, optionally restricted to a section.
    pub fn idmaps(
        &self,
        file_id: &str,
        section: Option<(Option<&str>, Option<&str>)>,
    ) -> Result<Vec<IdMapEntry>, LoadError> {
        let file = self.idmap(file_id)?;
        Ok(match section {
            Some((start, end)) => file.section(start, end).to_vec(),
            None => file.entries,
        })
    }

    pub fn parameters(&self, scope: ParameterScope) -> Result<ParameterView, LoadError> {
        let path = self.file(REGION_CONFIG_FOLDER, PARAMETERS_FILE)?.to_path_buf();
        let text = read_text(&path)?;
        let (groups, params) =
            xml::parse_parameters(&text).map_err(|source| LoadError::Xml { path, source })?;
        Ok(match scope {
            ParameterScope::Groups => ParameterView::Groups(groups),
            ParameterScope::Parameters => ParameterView::Parameters(params),
        })
    }

    /// Individual parameters by id.
    pub fn parameter_catalogue(&self) -> Result<BTreeMap<String, Parameter>, LoadError> {
        match self.parameters(ParameterScope::Parameters)? {
            ParameterView::Parameters(p) => Ok(p),
            ParameterView::Groups(_) => Ok(BTreeMap::new()),
        }
    }

    /// A CSV in `MapLayerFiles`, with `.csv` appended when omitted.
    fn map_layer_csv(&self, name: &str) -> Result<PathBuf, LoadError> {
        let stem = name
            .strip_suffix(".csv")
            .or_else(|| name.strip_suffix(".CSV"))
            .unwrap_or(name);
        self.file(MAP_LAYER_FOLDER, stem).map(Path::to_path_buf)
    }
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `{folder name → {stem → path}}` for `.xml` and `.csv` files one level
/// below `root`.
fn index_directory(root: &Path) -> Result<BTreeMap<String, BTreeMap<String, PathBuf>>, LoadError> {
    let mut buckets: BTreeMap<String, BTreeMap<String, PathBuf>> = BTreeMap::new();
    let mut folders: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|source| LoadError::Io {
            path: root.to_path_buf(),
            source,
        })?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    folders.sort();

    for folder in folders {
        let Some(folder_name) = folder.file_name().map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        let mut files: Vec<PathBuf> = std::fs::read_dir(&folder)
            .map_err(|source| LoadError::Io {
                path: folder.clone(),
                source,
            })?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let bucket = buckets.entry(folder_name.clone()).or_default();
        for file in files {
            let ext = file
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            if ext != "xml" && ext != "csv" {
                continue;
            }
            let Some(stem) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if let Some(existing) = bucket.get(&stem) {
                warn!(
                    folder = %folder_name,
                    kept = %existing.display(),
                    skipped = %file.display(),
                    "Duplicate file stem"
                );
                continue;
            }
            bucket.insert(stem, file);
        }
    }
    Ok(buckets)
}
