//! # Equi-Join
//!
//! Joins two (values, positions) pairs on value equality and returns the
//! matching position pairs as two parallel lists.
//!
//! ## Strategies
//!
//! | Kind        | Build side        | Output order                          |
//! |-------------|-------------------|---------------------------------------|
//! | nested-loop | none              | outer row major, inner row minor      |
//! | naive-hash  | right             | same as nested-loop                   |
//! | hash        | smaller input     | probe-side major                      |
//! | grace-hash  | per partition     | partition major, then as naive-hash   |
//!
//! All strategies produce the same multiset of pairs. Nested-loop order is the
//! reference order.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::query::operator::JoinKind;
use crate::query::result::IntValues;

/// Rows per grace-hash partition the partition count aims for.
const GRACE_PARTITION_ROWS: usize = 1024;
const MAX_GRACE_PARTITIONS: usize = 64;

pub struct JoinInput<'a> {
    pub values: IntValues<'a>,
    pub positions: &'a [usize],
}

impl<'a> JoinInput<'a> {
    pub fn new(values: IntValues<'a>, positions: &'a [usize]) -> Result<Self> {
        if values.len() != positions.len() {
            return Err(Error::InvalidArgument(format!(
                "join input has {} values for {} positions",
                values.len(),
                positions.len()
            )));
        }
        Ok(Self { values, positions })
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}

pub fn join(
    kind: JoinKind,
    left: &JoinInput<'_>,
    right: &JoinInput<'_>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut out = (Vec::new(), Vec::new());

    match kind {
        JoinKind::NestedLoop => nested_loop(left, right, &mut out),
        JoinKind::NaiveHash => {
            let rows: Vec<usize> = (0..left.len()).collect();
            let inner: Vec<usize> = (0..right.len()).collect();
            hash_rows(left, &rows, right, &inner, &mut out);
        }
        JoinKind::Hash => hash_smaller(left, right, &mut out),
        JoinKind::GraceHash => grace_hash(left, right, &mut out),
    }

    tracing::debug!(
        ?kind,
        left = left.len(),
        right = right.len(),
        matched = out.0.len(),
        "join"
    );
    Ok(out)
}

fn nested_loop(left: &JoinInput<'_>, right: &JoinInput<'_>, out: &mut (Vec<usize>, Vec<usize>)) {
    for i in 0..left.len() {
        let v = left.values.get(i);
        for j in 0..right.len() {
            if right.values.get(j) == v {
                out.0.push(left.positions[i]);
                out.1.push(right.positions[j]);
            }
        }
    }
}

/// Builds a table over `right[inner]` and probes it with `left[rows]` in order.
fn hash_rows(
    left: &JoinInput<'_>,
    rows: &[usize],
    right: &JoinInput<'_>,
    inner: &[usize],
    out: &mut (Vec<usize>, Vec<usize>),
) {
    let mut table: HashMap<i64, SmallVec<[usize; 4]>> = HashMap::with_capacity(inner.len());
    for &j in inner {
        table.entry(right.values.get(j)).or_default().push(j);
    }

    for &i in rows {
        if let Some(matches) = table.get(&left.values.get(i)) {
            for &j in matches {
                out.0.push(left.positions[i]);
                out.1.push(right.positions[j]);
            }
        }
    }
}

fn hash_smaller(left: &JoinInput<'_>, right: &JoinInput<'_>, out: &mut (Vec<usize>, Vec<usize>)) {
    if right.len() <= left.len() {
        let rows: Vec<usize> = (0..left.len()).collect();
        let inner: Vec<usize> = (0..right.len()).collect();
        hash_rows(left, &rows, right, &inner, out);
    } else {
        let rows: Vec<usize> = (0..right.len()).collect();
        let inner: Vec<usize> = (0..left.len()).collect();
        let mut swapped = (Vec::new(), Vec::new());
        hash_rows(right, &rows, left, &inner, &mut swapped);
        out.0.extend(swapped.1);
        out.1.extend(swapped.0);
    }
}

fn grace_hash(left: &JoinInput<'_>, right: &JoinInput<'_>, out: &mut (Vec<usize>, Vec<usize>)) {
    let partitions = (left.len().max(right.len()) / GRACE_PARTITION_ROWS)
        .next_power_of_two()
        .clamp(1, MAX_GRACE_PARTITIONS);

    let left_parts = partition_rows(left, partitions);
    let right_parts = partition_rows(right, partitions);

    for (rows, inner) in left_parts.iter().zip(&right_parts) {
        if !rows.is_empty() && !inner.is_empty() {
            hash_rows(left, rows, right, inner, out);
        }
    }
}

fn partition_rows(input: &JoinInput<'_>, partitions: usize) -> Vec<Vec<usize>> {
    let mut parts: Vec<Vec<usize>> = vec![Vec::new(); partitions];
    for row in 0..input.len() {
        parts[partition_of(input.values.get(row), partitions)].push(row);
    }
    parts
}

fn partition_of(value: i64, partitions: usize) -> usize {
    let mixed = (value as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    (mixed >> 32) as usize & (partitions - 1)
}
