//! # Operator Descriptors
//!
//! The parser turns one DSL line into a [`Statement`]: the handle names the
//! statement binds plus an [`Operator`] describing what to do. Operator
//! arguments name catalog columns (`db.table.column`) or handle-table entries
//! through [`Source`]; the executor resolves them against the open catalog under
//! the catalog lock before touching any data.
//!
//! ## Selection Predicate
//!
//! A [`Predicate`] is a pair of comparators `(low, high)`. Each side is either
//! `NoComparison` or one of `<, >, =, <=, >=` against a constant. The two sides
//! combine as follows:
//!
//! ```text
//! (GreaterThanOrEqual a, LessThan b)  ->  a <= v && v < b      (range)
//! (NoComparison,         x)           ->  x(v)
//! (x,                    NoComparison)->  x(v)
//! (x,                    y) otherwise ->  x(v) || y(v)          (disjunction)
//! ```
//!
//! Only the `>= / <` pairing is a conjunction. Every other two-sided
//! combination is a disjunction, and callers relying on range semantics must
//! build the `>= / <` form.

use crate::btree::IndexKind;
use crate::config::NAME_SEPARATOR;

/// One side of a selection predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    NoComparison,
    LessThan(i64),
    GreaterThan(i64),
    Equal(i64),
    LessThanOrEqual(i64),
    GreaterThanOrEqual(i64),
}

impl Comparator {
    fn test(self, v: i64) -> bool {
        match self {
            Comparator::NoComparison => true,
            Comparator::LessThan(k) => v < k,
            Comparator::GreaterThan(k) => v > k,
            Comparator::Equal(k) => v == k,
            Comparator::LessThanOrEqual(k) => v <= k,
            Comparator::GreaterThanOrEqual(k) => v >= k,
        }
    }

    /// The same condition as a half-open interval `[lo, hi)`.
    fn interval(self) -> (i64, i64) {
        match self {
            Comparator::NoComparison => (i64::MIN, i64::MAX),
            Comparator::LessThan(k) => (i64::MIN, k),
            Comparator::GreaterThan(k) => (k.saturating_add(1), i64::MAX),
            Comparator::Equal(k) => (k, k.saturating_add(1)),
            Comparator::LessThanOrEqual(k) => (i64::MIN, k.saturating_add(1)),
            Comparator::GreaterThanOrEqual(k) => (k, i64::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    pub low: Comparator,
    pub high: Comparator,
}

impl Predicate {
    pub fn new(low: Comparator, high: Comparator) -> Self {
        Self { low, high }
    }

    /// Builds the predicate for `select(.., low, high)` where `None` is `null`.
    pub fn from_bounds(low: Option<i64>, high: Option<i64>) -> Self {
        match (low, high) {
            (None, Some(h)) => Self::new(Comparator::NoComparison, Comparator::LessThan(h)),
            (Some(l), None) => Self::new(Comparator::GreaterThanOrEqual(l), Comparator::NoComparison),
            (Some(l), Some(h)) => {
                Self::new(Comparator::GreaterThanOrEqual(l), Comparator::LessThan(h))
            }
            (None, None) => Self::new(
                Comparator::GreaterThanOrEqual(i64::MIN),
                Comparator::LessThan(i64::MAX),
            ),
        }
    }

    pub fn matches(&self, v: i64) -> bool {
        match (self.low, self.high) {
            (Comparator::GreaterThanOrEqual(_), Comparator::LessThan(_)) => {
                self.low.test(v) && self.high.test(v)
            }
            (Comparator::NoComparison, side) | (side, Comparator::NoComparison) => side.test(v),
            (a, b) => a.test(v) || b.test(v),
        }
    }

    /// The predicate as one half-open interval, when it is one.
    ///
    /// Two-sided disjunctions are not intervals and return `None`. The
    /// all-rows form `[i64::MIN, i64::MAX)` also covers `i64::MAX` itself,
    /// which no stored `i32` can reach.
    pub fn as_interval(&self) -> Option<(i64, i64)> {
        match (self.low, self.high) {
            (Comparator::GreaterThanOrEqual(l), Comparator::LessThan(h)) => Some((l, h)),
            (Comparator::NoComparison, side) | (side, Comparator::NoComparison) => {
                Some(side.interval())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    NestedLoop,
    Hash,
    NaiveHash,
    GraceHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Avg,
    Sum,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticKind {
    Add,
    Sub,
}

/// An operator input: a stored column or a handle-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Column(String),
    Handle(String),
}

impl Source {
    /// Qualified names address stored columns; bare names address handles.
    pub fn from_name(name: &str) -> Self {
        if name.contains(NAME_SEPARATOR) {
            Source::Column(name.to_string())
        } else {
            Source::Handle(name.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    CreateDatabase {
        name: String,
    },
    CreateTable {
        db: String,
        name: String,
        columns: usize,
    },
    CreateColumn {
        table: String,
        name: String,
        sorted: bool,
    },
    CreateIndex {
        column: String,
        kind: IndexKind,
        clustered: bool,
    },
    Insert {
        table: String,
        values: Vec<i64>,
    },
    Select {
        source: Source,
        reference: Option<String>,
        predicate: Predicate,
    },
    Fetch {
        column: String,
        positions: String,
    },
    Aggregate {
        kind: AggregateKind,
        input: Source,
    },
    Arithmetic {
        kind: ArithmeticKind,
        left: Source,
        right: Source,
    },
    Join {
        kind: JoinKind,
        left_values: String,
        left_positions: String,
        right_values: String,
        right_positions: String,
    },
    Print {
        inputs: Vec<Source>,
    },
    Load {
        path: String,
    },
    Shutdown,
}

impl Operator {
    /// Number of handle names the operator binds.
    pub fn output_count(&self) -> usize {
        match self {
            Operator::Select { .. }
            | Operator::Fetch { .. }
            | Operator::Aggregate { .. }
            | Operator::Arithmetic { .. } => 1,
            Operator::Join { .. } => 2,
            _ => 0,
        }
    }

    /// True for operators that change stored data or the catalog.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operator::CreateDatabase { .. }
                | Operator::CreateTable { .. }
                | Operator::CreateColumn { .. }
                | Operator::CreateIndex { .. }
                | Operator::Insert { .. }
                | Operator::Load { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub outputs: Vec<String>,
    pub operator: Operator,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(p: Predicate, col: &[i64]) -> Vec<usize> {
        col.iter()
            .enumerate()
            .filter(|(_, &v)| p.matches(v))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn bounds_build_range_predicate() {
        let col = [5, 15, 25, 15];

        assert_eq!(select(Predicate::from_bounds(Some(10), Some(20)), &col), [1, 3]);
        assert_eq!(select(Predicate::from_bounds(None, Some(20)), &col), [0, 1, 3]);
        assert_eq!(select(Predicate::from_bounds(Some(15), None), &col), [1, 2, 3]);
        assert_eq!(select(Predicate::from_bounds(None, None), &col), [0, 1, 2, 3]);
    }

    #[test]
    fn other_two_sided_pairs_are_disjunctions() {
        let p = Predicate::new(Comparator::LessThan(10), Comparator::GreaterThan(20));
        assert_eq!(select(p, &[5, 15, 25]), [0, 2]);

        let p = Predicate::new(Comparator::GreaterThan(10), Comparator::LessThan(20));
        assert_eq!(select(p, &[5, 15, 25]), [0, 1, 2]);
        assert_eq!(p.as_interval(), None);
    }

    #[test]
    fn one_sided_comparators_are_intervals() {
        let cases = [
            (Comparator::LessThanOrEqual(7), (i64::MIN, 8)),
            (Comparator::GreaterThan(7), (8, i64::MAX)),
            (Comparator::Equal(7), (7, 8)),
        ];
        for (c, interval) in cases {
            assert_eq!(
                Predicate::new(Comparator::NoComparison, c).as_interval(),
                Some(interval)
            );
            assert_eq!(
                Predicate::new(c, Comparator::NoComparison).as_interval(),
                Some(interval)
            );
        }
        assert_eq!(
            Predicate::from_bounds(Some(1), Some(4)).as_interval(),
            Some((1, 4))
        );
    }

    #[test]
    fn output_counts() {
        let join = Operator::Join {
            kind: JoinKind::Hash,
            left_values: "a".into(),
            left_positions: "b".into(),
            right_values: "c".into(),
            right_positions: "d".into(),
        };
        assert_eq!(join.output_count(), 2);
        assert_eq!(Operator::Shutdown.output_count(), 0);
        assert!(!join.is_mutation());
    }
}
