//! # Query Language End-to-End Tests
//!
//! Drives a [`Database`] the way a client does: one statement per line, then
//! checks `print` output and error kinds. Covers create, insert, load, select,
//! fetch, aggregates, arithmetic and every join strategy.

use std::fs;

use coldb::{Database, ErrorKind, ExecuteResult};
use tempfile::{tempdir, TempDir};

fn open() -> (Database, TempDir) {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("disk")).unwrap();
    (db, dir)
}

fn run(db: &Database, lines: &[impl AsRef<str>]) {
    for line in lines {
        let line = line.as_ref();
        db.execute(line)
            .unwrap_or_else(|e| panic!("'{}' failed: {}", line, e));
    }
}

fn print(db: &Database, line: &str) -> String {
    match db.execute(line).unwrap() {
        ExecuteResult::Printed(text) => text,
        other => panic!("'{}' printed nothing: {:?}", line, other),
    }
}

fn error_kind(db: &Database, line: &str) -> ErrorKind {
    match db.execute(line) {
        Ok(result) => panic!("'{}' succeeded with {:?}", line, result),
        Err(e) => e.kind(),
    }
}

fn single_column(db: &Database, table: &str, values: &[i32]) {
    run(
        db,
        &[
            &format!("create(tbl,\"{}\",db1,1)", table),
            &format!("create(col,\"a\",db1.{})", table),
        ],
    );
    for v in values {
        db.execute(&format!("relational_insert(db1.{},{})", table, v))
            .unwrap();
    }
}

#[test]
fn half_open_range_select() {
    let (db, _dir) = open();
    run(&db, &["create(db,\"db1\")"]);
    single_column(&db, "t", &[5, 15, 25, 15]);

    run(
        &db,
        &[
            "s=select(db1.t.a,10,20)",
            "f=fetch(db1.t.a,s)",
            "below=select(db1.t.a,null,20)",
            "fb=fetch(db1.t.a,below)",
            "above=select(db1.t.a,15,null)",
            "fa=fetch(db1.t.a,above)",
        ],
    );

    assert_eq!(print(&db, "print(f)"), "15\n15");
    assert_eq!(print(&db, "print(fb)"), "5\n15\n15");
    assert_eq!(print(&db, "print(fa)"), "15\n25\n15");
}

#[test]
fn select_positions_survive_fetch_and_reselect() {
    let (db, _dir) = open();
    run(
        &db,
        &[
            "create(db,\"db1\")",
            "create(tbl,\"t\",db1,2)",
            "create(col,\"a\",db1.t)",
            "create(col,\"b\",db1.t)",
            "relational_insert(db1.t,1,100)",
            "relational_insert(db1.t,2,200)",
            "relational_insert(db1.t,3,300)",
            "relational_insert(db1.t,4,400)",
            "p=select(db1.t.a,2,null)",
            "vb=fetch(db1.t.b,p)",
            "q=select(p,vb,250,null)",
            "out=fetch(db1.t.a,q)",
        ],
    );

    assert_eq!(print(&db, "print(out)"), "3\n4");
    assert_eq!(print(&db, "print(db1.t.a,db1.t.b)"), "1,100\n2,200\n3,300\n4,400");
}

#[test]
fn aggregates_and_arithmetic() {
    let (db, _dir) = open();
    run(&db, &["create(db,\"db1\")"]);
    single_column(&db, "t", &[4, -2, 10, 8]);

    run(
        &db,
        &[
            "s=select(db1.t.a,null,null)",
            "v=fetch(db1.t.a,s)",
            "total=sum(v)",
            "lo=min(db1.t.a)",
            "hi=max(v)",
            "mean=avg(db1.t.a)",
            "twice=add(v,v)",
            "zero=sub(v,db1.t.a)",
        ],
    );

    assert_eq!(print(&db, "print(total)"), "20");
    assert_eq!(print(&db, "print(lo)"), "-2");
    assert_eq!(print(&db, "print(hi)"), "10");
    assert_eq!(print(&db, "print(mean)"), "5.00");
    assert_eq!(print(&db, "print(twice)"), "8\n-4\n20\n16");
    assert_eq!(print(&db, "print(zero)"), "0\n0\n0\n0");
}

#[test]
fn avg_over_empty_result_is_zero() {
    let (db, _dir) = open();
    run(&db, &["create(db,\"db1\")"]);
    single_column(&db, "t", &[1, 2, 3]);

    run(
        &db,
        &[
            "none=select(db1.t.a,100,200)",
            "v=fetch(db1.t.a,none)",
            "m=avg(v)",
            "s=sum(v)",
        ],
    );

    assert_eq!(print(&db, "print(m)"), "0.00");
    assert_eq!(print(&db, "print(s)"), "0");
    assert_eq!(print(&db, "print(v)"), "");
}

/// Builds `vals1=[1,2,2]` at positions `[10,11,12]` and `vals2=[2,2,3]` at
/// positions `[20,21,22]`.
fn join_inputs(db: &Database) {
    run(db, &["create(db,\"db1\")"]);

    let mut left = vec![100; 10];
    left.extend([1, 2, 2]);
    single_column(db, "l", &left);

    let mut right = vec![100; 20];
    right.extend([2, 2, 3]);
    single_column(db, "r", &right);

    run(
        db,
        &[
            "p1=select(db1.l.a,null,50)",
            "v1=fetch(db1.l.a,p1)",
            "p2=select(db1.r.a,null,50)",
            "v2=fetch(db1.r.a,p2)",
        ],
    );
}

#[test]
fn nested_loop_join_reference_order() {
    let (db, _dir) = open();
    join_inputs(&db);

    run(&db, &["jl,jr=join(v1,p1,v2,p2,nested-loop)"]);
    let left = db.handle("jl").unwrap();
    let right = db.handle("jr").unwrap();

    assert_eq!(left.positions().unwrap(), &[11, 11, 12, 12]);
    assert_eq!(right.positions().unwrap(), &[20, 21, 20, 21]);
}

#[test]
fn join_strategies_agree_on_pairs() {
    let (db, _dir) = open();
    join_inputs(&db);

    let mut reference: Option<Vec<(usize, usize)>> = None;
    for kind in ["nested-loop", "naive-hash", "hash", "grace-hash"] {
        run(&db, &[&format!("jl,jr=join(v1,p1,v2,p2,{})", kind)]);
        let l = db.handle("jl").unwrap();
        let r = db.handle("jr").unwrap();
        let mut pairs: Vec<(usize, usize)> = l
            .positions()
            .unwrap()
            .iter()
            .copied()
            .zip(r.positions().unwrap().iter().copied())
            .collect();

        if kind == "naive-hash" {
            assert_eq!(pairs, vec![(11, 20), (11, 21), (12, 20), (12, 21)]);
        }
        pairs.sort_unstable();

        match &reference {
            None => reference = Some(pairs),
            Some(expected) => assert_eq!(&pairs, expected, "{} disagrees", kind),
        }
    }
}

#[test]
fn joined_positions_fetch_matching_values() {
    let (db, _dir) = open();
    join_inputs(&db);

    run(
        &db,
        &[
            "jl,jr=join(v1,p1,v2,p2,hash)",
            "lv=fetch(db1.l.a,jl)",
            "rv=fetch(db1.r.a,jr)",
        ],
    );

    assert_eq!(error_kind(&db, "print(jl)"), ErrorKind::TypeMismatch);
    assert_eq!(print(&db, "print(lv,rv)"), "2,2\n2,2\n2,2\n2,2");
}

#[test]
fn bulk_load_appends_rows() {
    let (db, dir) = open();
    run(
        &db,
        &[
            "create(db,\"db1\")",
            "create(tbl,\"t\",db1,2)",
            "create(col,\"a\",db1.t)",
            "create(col,\"b\",db1.t)",
            "relational_insert(db1.t,0,0)",
        ],
    );

    let csv = dir.path().join("data.csv");
    fs::write(&csv, "db1.t.b,db1.t.a\n10,1\n20,2\n30,3\n").unwrap();
    let result = db.execute(&format!("load(\"{}\")", csv.display())).unwrap();
    assert_eq!(result, ExecuteResult::Inserted { rows: 3 });

    assert_eq!(
        print(&db, "print(db1.t.a,db1.t.b)"),
        "0,0\n1,10\n2,20\n3,30"
    );

    fs::write(&csv, "db1.t.a,db1.t.b\n7,x\n").unwrap();
    assert_eq!(
        error_kind(&db, &format!("load(\"{}\")", csv.display())),
        ErrorKind::InvalidArgument
    );
    assert_eq!(print(&db, "print(db1.t.a)"), "0\n1\n2\n3");
}

#[test]
fn declared_btree_index_answers_like_a_scan() {
    let (db, _dir) = open();
    run(&db, &["create(db,\"db1\")"]);
    let values: Vec<i32> = (0..500).map(|i| (i * 37) % 101 - 50).collect();
    single_column(&db, "t", &values);

    run(
        &db,
        &[
            "scan=select(db1.t.a,-10,10)",
            "create(idx,db1.t.a,btree,unclustered)",
            "indexed=select(db1.t.a,-10,10)",
        ],
    );

    let scan = db.handle("scan").unwrap();
    let indexed = db.handle("indexed").unwrap();
    assert_eq!(scan.positions().unwrap(), indexed.positions().unwrap());

    run(&db, &["relational_insert(db1.t,0)", "again=select(db1.t.a,0,1)"]);
    let again = db.handle("again").unwrap();
    assert_eq!(again.positions().unwrap().last(), Some(&500));
}

#[test]
fn error_kinds() {
    let (db, _dir) = open();
    run(&db, &["create(db,\"db1\")"]);
    single_column(&db, "t", &[1]);

    assert_eq!(error_kind(&db, "s=select(db1.t.nope,1,2)"), ErrorKind::NotFound);
    assert_eq!(error_kind(&db, "f=fetch(db1.t.a,missing)"), ErrorKind::NotFound);
    assert_eq!(
        error_kind(&db, "create(tbl,\"t\",db1,1)"),
        ErrorKind::AlreadyExists
    );
    assert_eq!(
        error_kind(&db, "create(tbl,\"huge\",db1,100000000000000000)"),
        ErrorKind::InvalidArgument
    );
    assert_eq!(error_kind(&db, "create(col,\"b\",db1.t)"), ErrorKind::Full);
    assert_eq!(
        error_kind(&db, "relational_insert(db1.t,1,2)"),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        error_kind(&db, "relational_insert(db1.t,4294967296)"),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        error_kind(&db, "create(idx,db1.t.a,sorted,clustered)"),
        ErrorKind::NotImplemented
    );
    assert_eq!(error_kind(&db, "frobnicate(1)"), ErrorKind::Parse);

    run(&db, &["s=select(db1.t.a,null,null)", "v=fetch(db1.t.a,s)"]);
    assert_eq!(error_kind(&db, "x=fetch(db1.t.a,v)"), ErrorKind::TypeMismatch);
}
