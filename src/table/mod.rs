//! In-memory table abstraction: an ordered set of named columns over
//! [`CellValue`] cells.
//!
//! Column order is an explicit attribute of the table (the final workbook
//! layout depends on it), so reordering happens through named operations like
//! [`Table::insert_after`] rather than incidental container ordering.

pub mod cell;
pub mod csv;
pub mod error;
pub mod xlsx;

pub use cell::CellValue;
pub use error::TableError;

use std::collections::HashMap;

/// An ordered sequence of equally long named columns.
///
/// Duplicate column names are tolerated (merged workbooks can produce them);
/// name lookups resolve to the first match.
#[derive(Debug, Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn with_names(names: Vec<String>) -> Self {
        let columns = names.iter().map(|_| Vec::new()).collect();
        Self { names, columns }
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// The columns in order, parallel to [`column_names`](Self::column_names).
    pub fn columns(&self) -> &[Vec<CellValue>] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&[CellValue], TableError> {
        self.index_of(name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| TableError::missing_column(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Vec<CellValue>, TableError> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| TableError::missing_column(name))?;
        Ok(&mut self.columns[idx])
    }

    pub fn get(&self, row: usize, name: &str) -> Result<&CellValue, TableError> {
        Ok(&self.column(name)?[row])
    }

    pub fn set(&mut self, row: usize, name: &str, value: CellValue) -> Result<(), TableError> {
        self.column_mut(name)?[row] = value;
        Ok(())
    }

    /// Append one row. Short rows are padded with `Null`, long rows truncated
    /// to the table width (trailing workbook cells beyond the header are
    /// positional noise).
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.width(), CellValue::Null);
        for (column, cell) in self.columns.iter_mut().zip(cells) {
            column.push(cell);
        }
    }

    /// Append a column at the end of the column order.
    pub fn add_column(&mut self, name: &str, values: Vec<CellValue>) -> Result<(), TableError> {
        self.check_length(name, &values)?;
        self.names.push(name.to_string());
        self.columns.push(values);
        Ok(())
    }

    /// Insert a column immediately after `anchor` in the column order.
    pub fn insert_after(
        &mut self,
        anchor: &str,
        name: &str,
        values: Vec<CellValue>,
    ) -> Result<(), TableError> {
        self.check_length(name, &values)?;
        let idx = self
            .index_of(anchor)
            .ok_or_else(|| TableError::missing_column(anchor))?;
        self.names.insert(idx + 1, name.to_string());
        self.columns.insert(idx + 1, values);
        Ok(())
    }

    fn check_length(&self, name: &str, values: &[CellValue]) -> Result<(), TableError> {
        if !self.names.is_empty() && values.len() != self.height() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.height(),
                got: values.len(),
            });
        }
        Ok(())
    }

    /// Remove a column; its absence is an error.
    pub fn drop_column(&mut self, name: &str) -> Result<(), TableError> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| TableError::missing_column(name))?;
        self.names.remove(idx);
        self.columns.remove(idx);
        Ok(())
    }

    /// Remove every listed column that exists; returns the names actually
    /// dropped.
    pub fn drop_columns_if_present(&mut self, names: &[&str]) -> Vec<String> {
        let mut dropped = Vec::new();
        for name in names {
            while let Some(idx) = self.index_of(name) {
                self.names.remove(idx);
                self.columns.remove(idx);
                dropped.push((*name).to_string());
            }
        }
        dropped
    }

    /// Rename a column if it exists; returns whether a rename happened.
    pub fn rename_column_if_present(&mut self, from: &str, to: &str) -> bool {
        match self.index_of(from) {
            Some(idx) => {
                self.names[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace every cell of a column with `f(cell)`.
    pub fn apply<F>(&mut self, name: &str, mut f: F) -> Result<(), TableError>
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        for cell in self.column_mut(name)? {
            *cell = f(cell);
        }
        Ok(())
    }

    /// Keep only the rows whose mask entry is true.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut it = keep.iter();
            column.retain(|_| *it.next().unwrap_or(&false));
        }
    }

    /// Stable sort by one or more key columns, ascending, missing values
    /// last. Rows with equal keys keep their relative order.
    pub fn sort_by(&mut self, keys: &[&str]) -> Result<(), TableError> {
        let key_idx: Vec<usize> = keys
            .iter()
            .map(|k| {
                self.index_of(k)
                    .ok_or_else(|| TableError::missing_column(*k))
            })
            .collect::<Result<_, _>>()?;

        let mut order: Vec<usize> = (0..self.height()).collect();
        let columns = &self.columns;
        order.sort_by(|&a, &b| {
            for &ki in &key_idx {
                let ord = cell::compare(&columns[ki][a], &columns[ki][b]);
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });

        for column in &mut self.columns {
            let reordered: Vec<CellValue> = order.iter().map(|&i| column[i].clone()).collect();
            *column = reordered;
        }
        Ok(())
    }

    /// Left join on the given key columns.
    ///
    /// Every left row appears in the result; a left row with several right
    /// matches appears once per match, and a left row with none gets `Null`
    /// in the appended columns. Right-only rows are discarded. Non-key right
    /// columns are appended after the left columns; a name collision gets a
    /// `_y` suffix. A row whose key contains a missing value matches nothing.
    pub fn left_join(&self, right: &Table, keys: &[&str]) -> Result<Table, TableError> {
        for key in keys {
            self.column(key)?;
            right.column(key)?;
        }

        let value_cols: Vec<usize> = (0..right.width())
            .filter(|&i| !keys.contains(&right.names[i].as_str()))
            .collect();

        let mut names = self.names.clone();
        for &i in &value_cols {
            let base = &right.names[i];
            if names.iter().any(|n| n == base) {
                names.push(format!("{}_y", base));
            } else {
                names.push(base.clone());
            }
        }

        let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for row in 0..right.height() {
            if let Some(key) = row_key(right, keys, row) {
                index.entry(key).or_default().push(row);
            }
        }

        let mut out = Table::with_names(names);
        for row in 0..self.height() {
            let left_cells: Vec<CellValue> = (0..self.width())
                .map(|c| self.columns[c][row].clone())
                .collect();

            let matches = row_key(self, keys, row).and_then(|k| index.get(&k));
            match matches {
                Some(rows) => {
                    for &rr in rows {
                        let mut cells = left_cells.clone();
                        cells.extend(value_cols.iter().map(|&c| right.columns[c][rr].clone()));
                        out.push_row(cells);
                    }
                }
                None => {
                    let mut cells = left_cells;
                    cells.extend(value_cols.iter().map(|_| CellValue::Null));
                    out.push_row(cells);
                }
            }
        }
        Ok(out)
    }
}

/// Canonical join key for one row, or `None` when any key cell is missing.
fn row_key(table: &Table, keys: &[&str], row: usize) -> Option<Vec<String>> {
    keys.iter()
        .map(|k| {
            let cell = table.column(k).ok()?.get(row)?;
            match cell {
                CellValue::Null => None,
                other => Some(other.render()),
            }
        })
        .collect()
}
