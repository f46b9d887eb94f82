//! # Tables
//!
//! A table owns a fixed number of column slots decided at creation. Columns are
//! created one at a time into those slots; inserts require every slot filled.
//!
//! Multi-column writes (`insert_row`, `append_columns`) are all-or-nothing: each
//! touched column is snapshotted first and restored if any later column fails.

use std::path::Path;

use smallvec::SmallVec;

use super::column::{Column, ColumnState};
use super::validate_name;
use crate::error::{Error, Result};
use crate::storage::column_file_name;

#[derive(Debug)]
pub struct Table {
    name: String,
    capacity: usize,
    columns: Vec<Column>,
}

impl Table {
    pub(crate) fn new(name: String, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            columns: Vec::new(),
        }
    }

    pub(crate) fn from_columns(name: String, capacity: usize, columns: Vec<Column>) -> Self {
        Self {
            name,
            capacity,
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of column slots declared at creation.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Row count, taken from the first column.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::num_elements)
    }

    pub(crate) fn create_column(
        &mut self,
        db: &str,
        root: &Path,
        name: &str,
        sorted: bool,
    ) -> Result<&mut Column> {
        validate_name("column", name)?;

        if self.columns.len() >= self.capacity {
            return Err(Error::Full(format!(
                "table '{}' has all {} column slots in use",
                self.name, self.capacity
            )));
        }
        if self.column(name).is_some() {
            return Err(Error::InvalidArgument(format!(
                "column '{}' already exists in table '{}'",
                name, self.name
            )));
        }

        let path = root.join(column_file_name(db, &self.name, name));
        self.columns.push(Column::new(name.to_string(), sorted, path));

        let idx = self.columns.len() - 1;
        Ok(&mut self.columns[idx])
    }

    /// Appends one value to every column.
    pub fn insert_row(&mut self, values: &[i32]) -> Result<()> {
        if values.len() != self.capacity {
            return Err(Error::InvalidArgument(format!(
                "table '{}' expects {} values, got {}",
                self.name,
                self.capacity,
                values.len()
            )));
        }
        self.require_all_columns()?;

        let batch: SmallVec<[(usize, &[i32]); 8]> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i, std::slice::from_ref(v)))
            .collect();
        self.append_columns(&batch)
    }

    /// Appends `data[k].1` to column `data[k].0`, each at its current end.
    ///
    /// Either every listed column is extended or none is.
    pub fn append_columns(&mut self, data: &[(usize, &[i32])]) -> Result<()> {
        for &(idx, _) in data {
            if idx >= self.columns.len() {
                return Err(Error::NotFound(format!(
                    "column slot {} in table '{}'",
                    idx, self.name
                )));
            }
        }

        let mut done: SmallVec<[(usize, ColumnState); 8]> = SmallVec::new();
        for &(idx, values) in data {
            let column = &mut self.columns[idx];
            let state = column.snapshot();
            let offset = column.num_elements();

            if let Err(e) = column.extend_and_write(offset, values) {
                tracing::warn!(
                    table = %self.name,
                    column = %self.columns[idx].name(),
                    error = %e,
                    "rolling back partial write"
                );
                for &(prev, state) in done.iter().rev() {
                    self.columns[prev].restore(state);
                }
                return Err(e);
            }
            done.push((idx, state));
        }

        Ok(())
    }

    fn require_all_columns(&self) -> Result<()> {
        if self.columns.len() != self.capacity {
            return Err(Error::InvalidArgument(format!(
                "table '{}' has {} of {} columns created",
                self.name,
                self.columns.len(),
                self.capacity
            )));
        }
        Ok(())
    }
}
