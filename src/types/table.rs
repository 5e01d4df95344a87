//! Columnar record store shared by the loader, the checks and the report.
//!
//! A `Table` is a column schema plus rows of strings. Every CSV location set,
//! every check result and every report sheet is one of these, so the checks
//! can stay simple group-by passes over rows.

use std::collections::HashMap;

/// A rectangular table of string cells with a fixed column schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from owned columns and rows. Short rows are padded with
    /// empty cells and long rows truncated so the table stays rectangular.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row. The row is padded or truncated to the schema width.
    pub fn push_row<S: Into<String>>(&mut self, row: Vec<S>) {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Append a column filled with empty cells; no-op when it already exists.
    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.columns.len() - 1
    }

    /// Borrowed view of a single row.
    pub fn row(&self, idx: usize) -> Row<'_> {
        Row {
            table: self,
            cells: &self.rows[idx],
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { table: self, cells })
    }

    /// Raw cells of every row, in schema order.
    pub fn raw_rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cell value by row index and column name; empty when the column is absent.
    pub fn value(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|c| self.rows.get(row).map(|r| r[c].as_str()))
            .unwrap_or("")
    }

    /// Overwrite a cell; the column is created when missing.
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) {
        let c = self.add_column(column);
        if let Some(r) = self.rows.get_mut(row) {
            r[c] = value.into();
        }
    }

    /// Index from the values of `column` to the first row holding them.
    pub fn index_by(&self, column: &str) -> HashMap<String, usize> {
        let mut index = HashMap::new();
        if let Some(c) = self.column_index(column) {
            for (i, row) in self.rows.iter().enumerate() {
                index.entry(row[c].clone()).or_insert(i);
            }
        }
        index
    }

    /// Copy of this table restricted to (and ordered by) `columns`.
    /// Columns that do not exist come out empty.
    pub fn select(&self, columns: &[String]) -> Table {
        let positions: Vec<Option<usize>> =
            columns.iter().map(|c| self.column_index(c)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|p| p.map(|i| row[i].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Table {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Drop rows that repeat an earlier row exactly, keeping first occurrences.
    pub fn dedup(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
    }
}

/// Borrowed row with column-name access.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    /// Cell by column name, `None` when the column does not exist.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .column_index(column)
            .map(|i| self.cells[i].as_str())
    }

    /// Cell by column name, empty when the column does not exist.
    pub fn value(&self, column: &str) -> &'a str {
        self.get(column).unwrap_or("")
    }

    pub fn cells(&self) -> &'a [String] {
        self.cells
    }
}
