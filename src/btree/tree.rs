//! # Static Multi-Level Index
//!
//! `StaticBTree` is a read-only, implicit B-tree over a sorted array. It is built
//! once, bottom-up, and never modified: a mutation of the underlying column drops
//! the whole structure instead.
//!
//! ## Levels
//!
//! Level 0 is the sorted array itself and is not stored here. Every internal
//! level keeps the **first** element of each group of `fanout` consecutive
//! entries of the level below:
//!
//! ```text
//! fanout = 2
//!
//! level 3:  [ 1,                      9    ]
//! level 2:  [ 1,          4,          9    ]
//! level 1:  [ 1,    3,    4,    9,    9    ]
//! level 0:  [ 1, 2, 3, 4, 4, 6, 9, 9, 9, 9 ]
//! ```
//!
//! Internal keys are lower bounds of their subtree, not separators. Building stops
//! as soon as a level fits in a single group, so `n <= fanout` yields no internal
//! levels at all and lookup degenerates to a scan of the base array.
//!
//! ## Lookup
//!
//! Starting at the top level, scan forward inside the current node while the
//! next key is `<= target`, then descend into the group that entry covers. At the
//! base level this lands on the last slot `<= target`; walking backward over equal
//! values gives the first occurrence. Node scans are linear and bounded by
//! `fanout`.

use crate::config::MIN_INDEX_FANOUT;
use crate::error::{Error, Result};

/// Outcome of a lookup against the sorted base array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// First sorted position whose value is `>= key`.
    Position(usize),
    BelowMinimum,
    AboveMaximum,
}

#[derive(Debug, Clone)]
pub struct StaticBTree {
    fanout: usize,
    base_len: usize,
    /// `levels[0]` sits directly above the base array; the last entry is the root.
    levels: Vec<Vec<i32>>,
}

impl StaticBTree {
    /// Builds the internal levels over `sorted`. Returns `None` for an empty input.
    pub fn build(sorted: &[i32], fanout: usize) -> Result<Option<Self>> {
        if fanout < MIN_INDEX_FANOUT {
            return Err(Error::InvalidArgument(format!(
                "index fanout {} is below the minimum of {}",
                fanout, MIN_INDEX_FANOUT
            )));
        }
        if sorted.is_empty() {
            return Ok(None);
        }

        let mut levels: Vec<Vec<i32>> = Vec::new();
        loop {
            let below: &[i32] = levels.last().map_or(sorted, Vec::as_slice);
            if below.len() <= fanout {
                break;
            }
            let keys: Vec<i32> = below.chunks(fanout).map(|group| group[0]).collect();
            levels.push(keys);
        }

        Ok(Some(Self {
            fanout,
            base_len: sorted.len(),
            levels,
        }))
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }

    /// Number of internal levels (0 when the base fits in one node).
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, depth: usize) -> Option<&[i32]> {
        self.levels.get(depth).map(Vec::as_slice)
    }

    /// Finds the first position in `base` holding a value `>= key`.
    ///
    /// `base` must be the array the tree was built over.
    pub fn lookup(&self, base: &[i32], key: i32) -> Lookup {
        debug_assert_eq!(base.len(), self.base_len);

        let (Some(&min), Some(&max)) = (base.first(), base.last()) else {
            return Lookup::AboveMaximum;
        };
        if key < min {
            return Lookup::BelowMinimum;
        }
        if key > max {
            return Lookup::AboveMaximum;
        }

        let mut start = 0;
        let mut end = self.levels.last().map_or(base.len(), Vec::len);

        for depth in (0..self.levels.len()).rev() {
            let keys = &self.levels[depth];
            let slot = scan_node(keys, start, end, key);

            let below_len = if depth == 0 {
                base.len()
            } else {
                self.levels[depth - 1].len()
            };
            start = slot * self.fanout;
            end = (start + self.fanout).min(below_len);
        }

        let mut pos = scan_node(base, start, end, key);
        if base[pos] == key {
            while pos > 0 && base[pos - 1] == key {
                pos -= 1;
            }
            Lookup::Position(pos)
        } else {
            Lookup::Position(pos + 1)
        }
    }
}

/// Last slot in `keys[start..end]` whose value is `<= key`, or `start` if none.
fn scan_node(keys: &[i32], start: usize, end: usize, key: i32) -> usize {
    let mut slot = start;
    while slot + 1 < end && keys[slot + 1] <= key {
        slot += 1;
    }
    slot
}
