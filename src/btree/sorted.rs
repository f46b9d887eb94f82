//! # Sorted Projection
//!
//! A sorted copy of a column's values plus a parallel permutation back to the
//! original row positions:
//!
//! ```text
//! column:     [25, 5, 15, 5]
//! values:     [ 5, 5, 15, 25]
//! positions:  [ 1, 3,  2,  0]
//! ```
//!
//! Ties are broken by original position so the permutation is well defined and
//! the first entry of a run of equal values always maps to the lowest row.

#[derive(Debug, Clone)]
pub struct SortedProjection {
    values: Vec<i32>,
    positions: Vec<usize>,
}

impl SortedProjection {
    pub fn build(column: &[i32]) -> Self {
        let mut pairs: Vec<(i32, usize)> = column.iter().copied().zip(0..).collect();
        pairs.sort_unstable();

        let (values, positions) = pairs.into_iter().unzip();
        Self { values, positions }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn min(&self) -> Option<i32> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<i32> {
        self.values.last().copied()
    }

    /// Index of the first sorted entry `>= key` (binary search).
    pub fn lower_bound(&self, key: i32) -> usize {
        self.values.partition_point(|&v| v < key)
    }
}
