//! # Stored Columns
//!
//! A `Column` couples the catalog-level description of a column (name, element
//! type, hints) with its live state: the logical element count, running
//! aggregates, the dirty flag, the backing `ColumnFile` and a lazily built index.
//!
//! ## Running Aggregates
//!
//! `min`, `max` and `sum` are maintained on every write so aggregates over a raw
//! column never need a scan. The empty column uses sentinels internally
//! (`min = i64::MAX`, `max = i64::MIN`, `sum = 0`) and reports `None` for min/max.
//!
//! ## Index Invalidation
//!
//! Every successful write drops the built index. The declared `IndexKind`
//! survives, so the next select that wants the index rebuilds it from the
//! current data.

use std::path::{Path, PathBuf};

use crate::btree::{ColumnIndex, IndexKind};
use crate::error::{Error, Result};
use crate::storage::ColumnFile;

/// Element type of a stored column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Int32,
}

impl ElementType {
    pub fn tag(self) -> u8 {
        match self {
            ElementType::Int32 => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ElementType::Int32),
            other => Err(Error::CorruptMetadata(format!(
                "unknown element type tag {}",
                other
            ))),
        }
    }
}

/// Snapshot of the mutable bookkeeping of a column, used to undo a
/// multi-column write that failed part way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnState {
    num_elements: usize,
    min: i64,
    max: i64,
    sum: i64,
    dirty: bool,
}

#[derive(Debug)]
pub struct Column {
    name: String,
    elem_type: ElementType,
    sorted: bool,
    index_kind: Option<IndexKind>,
    num_elements: usize,
    min: i64,
    max: i64,
    sum: i64,
    dirty: bool,
    path: PathBuf,
    file: Option<ColumnFile>,
    index: Option<ColumnIndex>,
}

impl Column {
    pub(crate) fn new(name: String, sorted: bool, path: PathBuf) -> Self {
        Self {
            name,
            elem_type: ElementType::Int32,
            sorted,
            index_kind: None,
            num_elements: 0,
            min: i64::MAX,
            max: i64::MIN,
            sum: 0,
            dirty: false,
            path,
            file: None,
            index: None,
        }
    }

    /// Rebuilds a column from persisted metadata; the file is attached separately.
    pub(crate) fn from_metadata(
        name: String,
        elem_type: ElementType,
        sorted: bool,
        index_kind: Option<IndexKind>,
        num_elements: usize,
        stats: (i64, i64, i64),
        path: PathBuf,
    ) -> Self {
        let (min, max, sum) = stats;
        Self {
            name,
            elem_type,
            sorted,
            index_kind,
            num_elements,
            min,
            max,
            sum,
            dirty: false,
            path,
            file: None,
            index: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elem_type(&self) -> ElementType {
        self.elem_type
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn index_kind(&self) -> Option<IndexKind> {
        self.index_kind
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn min(&self) -> Option<i64> {
        (self.num_elements > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<i64> {
        (self.num_elements > 0).then_some(self.max)
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> Option<&ColumnFile> {
        self.file.as_ref()
    }

    pub(crate) fn raw_stats(&self) -> (i64, i64, i64) {
        (self.min, self.max, self.sum)
    }

    pub(crate) fn attach_file(&mut self, file: ColumnFile) {
        self.file = Some(file);
    }

    #[cfg(test)]
    pub(crate) fn file_mut(&mut self) -> Option<&mut ColumnFile> {
        self.file.as_mut()
    }

    /// The stored elements. Fails when the column has rows but no mapped data,
    /// which only happens after a partial load.
    pub fn values(&self) -> Result<&[i32]> {
        if self.num_elements == 0 {
            return Ok(&[]);
        }
        match &self.file {
            Some(file) => Ok(file.values(self.num_elements)?),
            None => Err(Error::Storage(eyre::eyre!(
                "column '{}' has {} elements but no backing data",
                self.name,
                self.num_elements
            ))),
        }
    }

    /// Declares the index organization. Any built index is discarded.
    pub fn set_index_kind(&mut self, kind: IndexKind) {
        self.index_kind = Some(kind);
        self.index = None;
    }

    /// The built index, if one exists and is still current.
    pub fn index(&self) -> Option<&ColumnIndex> {
        self.index.as_ref()
    }

    /// True when an index is declared but has not been built for the current data.
    pub fn needs_index_build(&self) -> bool {
        self.index_kind.is_some() && self.index.is_none() && self.num_elements > 0
    }

    /// Builds the declared index if it is missing.
    pub fn ensure_index(&mut self, fanout: usize) -> Result<Option<&ColumnIndex>> {
        let Some(kind) = self.index_kind else {
            return Ok(None);
        };
        if self.index.is_none() {
            self.index = ColumnIndex::build(kind, self.values()?, fanout)?;
        }
        Ok(self.index.as_ref())
    }

    /// Writes `values` at element `offset`, growing the backing file as needed.
    ///
    /// Appending (`offset == num_elements`) updates the aggregates incrementally;
    /// an overwrite recomputes them. On failure nothing observable changes.
    pub fn extend_and_write(&mut self, offset: usize, values: &[i32]) -> Result<()> {
        if offset > self.num_elements {
            return Err(Error::InvalidArgument(format!(
                "write at offset {} leaves a gap in column '{}' of {} elements",
                offset, self.name, self.num_elements
            )));
        }
        if values.is_empty() {
            return Ok(());
        }
        if self.file.is_none() && self.num_elements > 0 {
            return Err(Error::Storage(eyre::eyre!(
                "column '{}' has no backing data to extend",
                self.name
            )));
        }

        let new_len = self.num_elements.max(offset + values.len());
        let appending = offset == self.num_elements;

        let (min, max, sum) = if appending {
            fold_stats((self.min, self.max, self.sum), values, &self.name)?
        } else {
            let mut merged = self.values()?.to_vec();
            merged.resize(new_len, 0);
            merged[offset..offset + values.len()].copy_from_slice(values);
            fold_stats((i64::MAX, i64::MIN, 0), &merged, &self.name)?
        };

        if self.file.is_none() {
            self.file = Some(ColumnFile::create(&self.path)?);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_at(offset, values)?;
        }

        self.num_elements = new_len;
        self.min = min;
        self.max = max;
        self.sum = sum;
        self.dirty = true;
        self.index = None;

        Ok(())
    }

    pub(crate) fn snapshot(&self) -> ColumnState {
        ColumnState {
            num_elements: self.num_elements,
            min: self.min,
            max: self.max,
            sum: self.sum,
            dirty: self.dirty,
        }
    }

    /// Rolls bookkeeping back to `state`. Bytes written past the restored length
    /// stay in the file but are never visible.
    pub(crate) fn restore(&mut self, state: ColumnState) {
        self.num_elements = state.num_elements;
        self.min = state.min;
        self.max = state.max;
        self.sum = state.sum;
        self.dirty = state.dirty;
        self.index = None;
    }

    /// Truncates the backing file to the logical size and flushes it, if dirty.
    pub fn persist(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        if let Some(file) = self.file.as_mut() {
            file.truncate_and_sync(self.num_elements)?;
        }
        self.dirty = false;
        Ok(true)
    }
}

fn fold_stats(start: (i64, i64, i64), values: &[i32], column: &str) -> Result<(i64, i64, i64)> {
    let (mut min, mut max, mut sum) = start;
    for &v in values {
        let v = v as i64;
        min = min.min(v);
        max = max.max(v);
        sum = sum.checked_add(v).ok_or_else(|| {
            Error::InvalidArgument(format!("sum of column '{}' overflows i64", column))
        })?;
    }
    Ok((min, max, sum))
}
