//! Location sets: the CSV of a `locationSet` with its attribute files joined
//! on and a point geometry per row.

use super::xml::LocationSetMeta;
use crate::types::{Crs, Point, Row, Table};
use std::collections::HashMap;
use std::path::PathBuf;

/// A loaded location set.
#[derive(Debug, Clone)]
pub struct LocationSet {
    pub meta: LocationSetMeta,
    /// Path of the source CSV
    pub path: PathBuf,
    /// Source columns followed by joined attribute columns
    pub table: Table,
    source_columns: Vec<String>,
    pub geometry: Vec<Option<Point>>,
    pub crs: Option<Crs>,
    index: HashMap<String, usize>,
}

impl LocationSet {
    /// Build from the source CSV. Geometry is read from the columns the
    /// metadata names.
    pub fn new(meta: LocationSetMeta, path: PathBuf, table: Table) -> Self {
        let source_columns = table.columns().to_vec();
        let geometry = table
            .rows()
            .map(|row| {
                Point::parse(
                    row.value(&meta.x_column),
                    row.value(&meta.y_column),
                    meta.z_column.as_deref().and_then(|z| row.get(z)),
                )
            })
            .collect();
        let crs = meta.geo_datum.as_deref().and_then(Crs::from_geo_datum);
        let index = table.index_by(&meta.id_column);
        Self {
            meta,
            path,
            table,
            source_columns,
            geometry,
            crs,
            index,
        }
    }

    /// An empty set with the given columns, for tests and missing optional sets.
    pub fn from_table(id: &str, csv_file: &str, table: Table) -> Self {
        let meta = LocationSetMeta {
            id: id.to_string(),
            csv_file: csv_file.to_string(),
            id_column: "LOC_ID".to_string(),
            name_column: Some("LOC_NAME".to_string()),
            x_column: "X".to_string(),
            y_column: "Y".to_string(),
            ..Default::default()
        };
        Self::new(meta, PathBuf::from(csv_file), table)
    }

    /// Join an attribute CSV on the id column. Columns already present are
    /// left alone; rows without a match get empty cells.
    pub fn join_attributes(&mut self, attributes: &Table, id_column: &str) {
        let lookup = attributes.index_by(id_column);
        let new_columns: Vec<&String> = attributes
            .columns()
            .iter()
            .filter(|c| c.as_str() != id_column && !self.table.has_column(c))
            .collect();
        for column in &new_columns {
            self.table.add_column(column);
        }
        for row in 0..self.table.len() {
            let loc_id = self.table.value(row, &self.meta.id_column).to_string();
            if let Some(&src) = lookup.get(&loc_id) {
                for column in &new_columns {
                    let value = attributes.value(src, column).to_string();
                    self.table.set(row, column, value);
                }
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// CSV file name the set was read from (and is regenerated to).
    pub fn csv_file_name(&self) -> String {
        self.meta.csv_file_name()
    }

    /// Columns of the source CSV, in file order.
    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn loc_id(&self, row: usize) -> &str {
        self.table.value(row, &self.meta.id_column)
    }

    /// All `LOC_ID`s in file order.
    pub fn loc_ids(&self) -> impl Iterator<Item = &str> {
        (0..self.len()).map(move |i| self.loc_id(i))
    }

    pub fn position(&self, loc_id: &str) -> Option<usize> {
        self.index.get(loc_id).copied()
    }

    pub fn contains(&self, loc_id: &str) -> bool {
        self.index.contains_key(loc_id)
    }

    pub fn get(&self, loc_id: &str) -> Option<Row<'_>> {
        self.position(loc_id).map(|i| self.table.row(i))
    }

    pub fn geometry_of(&self, loc_id: &str) -> Option<Point> {
        self.position(loc_id).and_then(|i| self.geometry[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LocationSet {
        let mut table = Table::new(&["LOC_ID", "LOC_NAME", "X", "Y"]);
        table.push_row(vec!["KW100010", "A", "1.0", "2.0"]);
        table.push_row(vec!["KW100020", "B", "", "2.0"]);
        LocationSet::from_table("OPVLWATER_HOOFDLOC", "oppvlwater_hoofdloc", table)
    }

    #[test]
    fn test_geometry_and_index() {
        let set = sample();
        assert_eq!(set.geometry_of("KW100010"), Some(Point::new(1.0, 2.0)));
        assert_eq!(set.geometry_of("KW100020"), None);
        assert!(set.contains("KW100020"));
        assert_eq!(set.csv_file_name(), "oppvlwater_hoofdloc.csv");
    }

    #[test]
    fn test_join_keeps_source_columns() {
        let mut set = sample();
        let mut attrs = Table::new(&["LOC_ID", "HS1_HMAX", "LOC_NAME"]);
        attrs.push_row(vec!["KW100010", "2.0", "ignored"]);
        set.join_attributes(&attrs, "LOC_ID");
        assert_eq!(set.table.value(0, "HS1_HMAX"), "2.0");
        assert_eq!(set.table.value(1, "HS1_HMAX"), "");
        assert_eq!(set.table.value(0, "LOC_NAME"), "A");
        assert_eq!(set.source_columns().len(), 4);
    }
}
