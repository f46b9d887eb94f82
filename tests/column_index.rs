//! Index lookups must agree with a linear scan for every key, including keys
//! below, above and between stored values and runs of duplicates.

use coldb::btree::{ColumnIndex, IndexKind, Lookup, SortedProjection, StaticBTree};

fn first_at_least(sorted: &[i32], key: i32) -> usize {
    sorted.iter().position(|&v| v >= key).unwrap_or(sorted.len())
}

fn column(len: usize) -> Vec<i32> {
    // Deterministic mix with long duplicate runs and negatives.
    (0..len as i64)
        .map(|i| ((i * 7919) % 613 - 300) as i32 / 3)
        .collect()
}

#[test]
fn lookup_finds_first_occurrence_at_many_fanouts() {
    let values = column(2000);
    let projection = SortedProjection::build(&values);
    let sorted = projection.values();

    for fanout in [2, 3, 4, 16, 64, 1000, 4096] {
        let tree = StaticBTree::build(sorted, fanout).unwrap().unwrap();
        for key in -110..110 {
            let expected = first_at_least(sorted, key);
            let got = match tree.lookup(sorted, key) {
                Lookup::Position(pos) => pos,
                Lookup::BelowMinimum => 0,
                Lookup::AboveMaximum => sorted.len(),
            };
            assert_eq!(got, expected, "fanout {} key {}", fanout, key);
        }
    }
}

#[test]
fn below_and_above_range() {
    let sorted = [3, 3, 5, 9];
    let tree = StaticBTree::build(&sorted, 2).unwrap().unwrap();

    assert_eq!(tree.lookup(&sorted, 2), Lookup::BelowMinimum);
    assert_eq!(tree.lookup(&sorted, 10), Lookup::AboveMaximum);
    assert_eq!(tree.lookup(&sorted, 3), Lookup::Position(0));
    assert_eq!(tree.lookup(&sorted, 4), Lookup::Position(2));
    assert_eq!(tree.lookup(&sorted, 9), Lookup::Position(3));
}

#[test]
fn tree_height_shrinks_with_fanout() {
    let sorted: Vec<i32> = (0..10_000).collect();

    let narrow = StaticBTree::build(&sorted, 2).unwrap().unwrap();
    let wide = StaticBTree::build(&sorted, 128).unwrap().unwrap();
    assert!(narrow.height() > wide.height());
    assert_eq!(wide.height(), 1);

    let root = wide.level(wide.height() - 1).unwrap();
    assert!(root.len() <= 128);
}

#[test]
fn range_matches_scan_for_both_kinds() {
    let values = column(1500);

    for kind in [IndexKind::Sorted, IndexKind::BTree] {
        let index = ColumnIndex::build(kind, &values, 8).unwrap().unwrap();
        assert_eq!(index.len(), values.len());

        for (lo, hi) in [(-50, 50), (0, 1), (-1000, 1000), (20, 20), (30, -30)] {
            let expected: Vec<usize> = values
                .iter()
                .enumerate()
                .filter(|&(_, &v)| (lo..hi).contains(&(v as i64)))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(index.range(lo, hi), expected, "{:?} [{}, {})", kind, lo, hi);
        }

        assert_eq!(index.range(i64::MIN, i64::MAX).len(), values.len());
    }
}
