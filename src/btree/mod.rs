//! # Column Index
//!
//! This module implements the read-only index structures used to accelerate
//! range and point selects on a stored column.
//!
//! ## Architecture Overview
//!
//! An index is a structural cache, never a source of truth:
//!
//! ```text
//! ColumnIndex
//! ├── SortedProjection   sorted copy of the column + permutation to row positions
//! └── StaticBTree        (BTree kind only) first-key levels over the sorted copy
//! ```
//!
//! The base column's storage stays authoritative. A column that is mutated after
//! its index was built drops the index; the next select that wants it rebuilds it
//! from the current data.
//!
//! ## Index Kinds
//!
//! - **Sorted**: binary search over the sorted projection.
//! - **BTree**: the static multi-level tree over the same projection, descending
//!   with bounded linear scans per node.
//!
//! Both answer the same question, "first sorted position whose value is `>= key`",
//! and therefore produce identical select results.
//!
//! ## Range Queries
//!
//! Selects hand the index a half-open interval `[lo, hi)` in `i64`. The matching
//! rows are `positions[lower(lo)..lower(hi)]`, returned ascending so the index
//! path and the scan path emit the same position list.

mod sorted;
mod tree;

pub use sorted::SortedProjection;
pub use tree::{Lookup, StaticBTree};

use crate::error::{Error, Result};

/// Declared index organization for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Sorted,
    BTree,
}

impl IndexKind {
    /// Metadata tag; `0` is reserved for "no index".
    pub fn tag(self) -> u8 {
        match self {
            IndexKind::Sorted => 1,
            IndexKind::BTree => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Option<Self>> {
        match tag {
            0 => Ok(None),
            1 => Ok(Some(IndexKind::Sorted)),
            2 => Ok(Some(IndexKind::BTree)),
            other => Err(Error::CorruptMetadata(format!(
                "unknown index kind tag {}",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::Sorted => "sorted",
            IndexKind::BTree => "btree",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnIndex {
    kind: IndexKind,
    projection: SortedProjection,
    tree: Option<StaticBTree>,
}

impl ColumnIndex {
    /// Builds an index over `column`. An empty column yields no index.
    pub fn build(kind: IndexKind, column: &[i32], fanout: usize) -> Result<Option<Self>> {
        if column.is_empty() {
            return Ok(None);
        }

        let projection = SortedProjection::build(column);
        let tree = match kind {
            IndexKind::Sorted => None,
            IndexKind::BTree => StaticBTree::build(projection.values(), fanout)?,
        };

        tracing::debug!(
            kind = kind.as_str(),
            rows = column.len(),
            height = tree.as_ref().map_or(0, StaticBTree::height),
            "built column index"
        );

        Ok(Some(Self {
            kind,
            projection,
            tree,
        }))
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.projection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projection.is_empty()
    }

    pub fn projection(&self) -> &SortedProjection {
        &self.projection
    }

    /// First sorted position whose value is `>= key`, for any `i64` key.
    pub fn lower_bound(&self, key: i64) -> usize {
        if key <= i32::MIN as i64 {
            return 0;
        }
        if key > i32::MAX as i64 {
            return self.projection.len();
        }
        let key = key as i32;

        match &self.tree {
            Some(tree) => match tree.lookup(self.projection.values(), key) {
                Lookup::Position(pos) => pos,
                Lookup::BelowMinimum => 0,
                Lookup::AboveMaximum => self.projection.len(),
            },
            None => self.projection.lower_bound(key),
        }
    }

    /// Row positions whose value lies in `[lo, hi)`, ascending.
    pub fn range(&self, lo: i64, hi: i64) -> Vec<usize> {
        if lo >= hi {
            return Vec::new();
        }
        let start = self.lower_bound(lo);
        let end = self.lower_bound(hi).max(start);

        let mut rows = self.projection.positions()[start..end].to_vec();
        rows.sort_unstable();
        rows
    }
}
