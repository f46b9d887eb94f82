//! # Operator Execution
//!
//! Executes one parsed [`Statement`] against the open catalog and the handle
//! table. Operators split into two groups by the lock they need:
//!
//! - **Mutations** (`create`, `relational_insert`, `load`) take `&mut Catalog`
//!   and never touch the handle table.
//! - **Queries** (`select`, `fetch`, aggregates, arithmetic, `join`, `print`)
//!   read the catalog through `&Catalog` and bind their outputs in the handle
//!   table.
//!
//! Operator arguments arrive as names. Each name is resolved here, under the
//! caller's catalog guard, into a [`GeneralizedColumn`]: qualified names become
//! [`GeneralizedColumn::Raw`] column ids, bare names are looked up in the handle
//! table. Column data is only ever borrowed from the guard, so no slice into a
//! column mapping survives past the statement.
//!
//! ## Output Binding
//!
//! A query computes all of its outputs before binding any of them, and checks
//! that the handle table has room for every output first. A failing operator
//! therefore leaves the handle table unchanged.

mod aggregate;
mod arithmetic;
mod fetch;
mod join;
mod print;
mod select;

use std::borrow::Cow;
use std::path::Path;

use smallvec::{smallvec, SmallVec};

use super::handles::HandleTable;
use super::loader;
use super::operator::{Operator, Source, Statement};
use super::result::{GeneralizedColumn, IntValues, ResultColumn};
use crate::btree::IndexKind;
use crate::error::{Error, Result};
use crate::schema::{Catalog, ColumnId, PersistReport};

pub use join::JoinInput;

/// What a statement did.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteResult {
    /// Nothing to do (blank line or comment).
    Noop,
    Created {
        object: &'static str,
        name: String,
    },
    IndexDeclared {
        column: String,
        kind: IndexKind,
    },
    Inserted {
        rows: usize,
    },
    /// Handle names the statement bound, in statement order.
    Bound {
        handles: Vec<String>,
    },
    Printed(String),
    Shutdown(PersistReport),
}

impl ExecuteResult {
    /// Text to show the client, if the statement produced any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecuteResult::Printed(text) => Some(text),
            _ => None,
        }
    }
}

type Outputs = SmallVec<[GeneralizedColumn; 2]>;

fn resolve<'a>(
    catalog: &Catalog,
    handles: &'a HandleTable,
    source: &Source,
) -> Result<Cow<'a, GeneralizedColumn>> {
    match source {
        Source::Column(name) => Ok(Cow::Owned(GeneralizedColumn::Raw(
            catalog.lookup_column(name)?,
        ))),
        Source::Handle(name) => Ok(Cow::Borrowed(handles.get(name)?)),
    }
}

/// The column whose declared index must be built before `operator` runs.
///
/// Only a select over a raw column without a reference list consults an index.
pub fn index_to_build(catalog: &Catalog, operator: &Operator) -> Option<ColumnId> {
    let Operator::Select {
        source: Source::Column(name),
        reference: None,
        ..
    } = operator
    else {
        return None;
    };
    let id = catalog.lookup_column(name).ok()?;
    catalog
        .column(id)
        .ok()
        .filter(|c| c.needs_index_build())
        .map(|_| id)
}

/// Runs a catalog-mutating operator.
pub fn execute_mutation(catalog: &mut Catalog, operator: &Operator) -> Result<ExecuteResult> {
    match operator {
        Operator::CreateTable { db, name, columns } => {
            if db != catalog.name() {
                return Err(Error::NotFound(format!("database '{}'", db)));
            }
            catalog.create_table(name, *columns)?;
            Ok(ExecuteResult::Created {
                object: "table",
                name: format!("{}.{}", db, name),
            })
        }
        Operator::CreateColumn {
            table,
            name,
            sorted,
        } => {
            let t = catalog.lookup_table(table)?;
            let id = catalog.create_column(t, name, *sorted)?;
            Ok(ExecuteResult::Created {
                object: "column",
                name: catalog.qualified_name(id)?,
            })
        }
        Operator::CreateIndex {
            column,
            kind,
            clustered,
        } => {
            if *clustered {
                return Err(Error::NotImplemented(format!(
                    "clustered {} index on '{}'",
                    kind.as_str(),
                    column
                )));
            }
            let id = catalog.lookup_column(column)?;
            catalog.column_mut(id)?.set_index_kind(*kind);
            tracing::debug!(column = %column, kind = kind.as_str(), "declared index");
            Ok(ExecuteResult::IndexDeclared {
                column: column.clone(),
                kind: *kind,
            })
        }
        Operator::Insert { table, values } => {
            let t = catalog.lookup_table(table)?;
            let row = values
                .iter()
                .map(|&v| {
                    i32::try_from(v).map_err(|_| {
                        Error::InvalidArgument(format!("value {} does not fit in int32", v))
                    })
                })
                .collect::<Result<SmallVec<[i32; 8]>>>()?;
            catalog.table_mut(t)?.insert_row(&row)?;
            Ok(ExecuteResult::Inserted { rows: 1 })
        }
        Operator::Load { path } => load(catalog, Path::new(path)),
        other => Err(Error::InvalidArgument(format!(
            "{} is not a catalog mutation",
            operator_name(other)
        ))),
    }
}

fn load(catalog: &mut Catalog, path: &Path) -> Result<ExecuteResult> {
    let batch = loader::read_csv(path)?;
    let ids = batch
        .columns
        .iter()
        .map(|name| catalog.lookup_column(name))
        .collect::<Result<Vec<_>>>()?;

    let table = ids[0].table;
    if let Some(pos) = ids.iter().position(|id| id.table != table) {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not in the same table as '{}'",
            batch.columns[pos], batch.columns[0]
        )));
    }

    let data: SmallVec<[(usize, &[i32]); 8]> = ids
        .iter()
        .zip(&batch.values)
        .map(|(id, values)| (id.column, values.as_slice()))
        .collect();
    catalog.table_mut(table)?.append_columns(&data)?;

    tracing::info!(
        path = %path.display(),
        columns = ids.len(),
        rows = batch.rows(),
        "bulk loaded"
    );
    Ok(ExecuteResult::Inserted { rows: batch.rows() })
}

/// Runs a read-only operator and binds its outputs.
pub fn execute_query(
    catalog: &Catalog,
    handles: &mut HandleTable,
    statement: &Statement,
) -> Result<ExecuteResult> {
    if let Operator::Print { inputs } = &statement.operator {
        let resolved = inputs
            .iter()
            .map(|s| resolve(catalog, handles, s))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&GeneralizedColumn> = resolved.iter().map(|c| c.as_ref()).collect();
        return Ok(ExecuteResult::Printed(print::render(catalog, &refs)?));
    }

    let outputs = compute(catalog, handles, &statement.operator)?;
    if outputs.len() != statement.outputs.len() {
        return Err(Error::InvalidArgument(format!(
            "{} produces {} output(s), {} name(s) given",
            operator_name(&statement.operator),
            outputs.len(),
            statement.outputs.len()
        )));
    }

    handles.ensure_room(&statement.outputs)?;
    for (name, value) in statement.outputs.iter().zip(outputs) {
        handles.insert(name, value)?;
    }
    Ok(ExecuteResult::Bound {
        handles: statement.outputs.clone(),
    })
}

fn compute(catalog: &Catalog, handles: &HandleTable, operator: &Operator) -> Result<Outputs> {
    let result = |r: ResultColumn| -> Outputs { smallvec![GeneralizedColumn::Result(r)] };

    match operator {
        Operator::Select {
            source,
            reference,
            predicate,
        } => {
            let input = resolve(catalog, handles, source)?;
            let reference = match reference {
                Some(name) => Some(handles.get(name)?.positions()?),
                None => None,
            };
            let rows = select::select(catalog, &input, reference, predicate)?;
            Ok(result(ResultColumn::Positions(rows)))
        }
        Operator::Fetch { column, positions } => {
            let id = catalog.lookup_column(column)?;
            let positions = handles.get(positions)?.positions()?;
            Ok(result(ResultColumn::Int(fetch::fetch(catalog, id, positions)?)))
        }
        Operator::Aggregate { kind, input } => {
            let input = resolve(catalog, handles, input)?;
            Ok(result(aggregate::aggregate(catalog, *kind, &input)?))
        }
        Operator::Arithmetic { kind, left, right } => {
            let left = resolve(catalog, handles, left)?;
            let right = resolve(catalog, handles, right)?;
            Ok(result(ResultColumn::Int(arithmetic::arithmetic(
                catalog, *kind, &left, &right,
            )?)))
        }
        Operator::Join {
            kind,
            left_values,
            left_positions,
            right_values,
            right_positions,
        } => {
            let lv = resolve(catalog, handles, &Source::from_name(left_values))?;
            let rv = resolve(catalog, handles, &Source::from_name(right_values))?;
            let left = JoinInput::new(
                IntValues::of(&lv, catalog)?,
                handles.get(left_positions)?.positions()?,
            )?;
            let right = JoinInput::new(
                IntValues::of(&rv, catalog)?,
                handles.get(right_positions)?.positions()?,
            )?;

            let (l, r) = join::join(*kind, &left, &right)?;
            Ok(smallvec![
                GeneralizedColumn::Result(ResultColumn::Positions(l)),
                GeneralizedColumn::Result(ResultColumn::Positions(r)),
            ])
        }
        other => Err(Error::InvalidArgument(format!(
            "{} is not a query operator",
            operator_name(other)
        ))),
    }
}

fn operator_name(operator: &Operator) -> &'static str {
    match operator {
        Operator::CreateDatabase { .. } => "create(db)",
        Operator::CreateTable { .. } => "create(tbl)",
        Operator::CreateColumn { .. } => "create(col)",
        Operator::CreateIndex { .. } => "create(idx)",
        Operator::Insert { .. } => "relational_insert",
        Operator::Select { .. } => "select",
        Operator::Fetch { .. } => "fetch",
        Operator::Aggregate { .. } => "aggregate",
        Operator::Arithmetic { .. } => "arithmetic",
        Operator::Join { .. } => "join",
        Operator::Print { .. } => "print",
        Operator::Load { .. } => "load",
        Operator::Shutdown => "shutdown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::query::parser::parse;
    use tempfile::tempdir;

    struct Session {
        catalog: Catalog,
        handles: HandleTable,
    }

    impl Session {
        fn new(dir: &Path) -> Self {
            Self {
                catalog: Catalog::new("db1", dir).unwrap(),
                handles: HandleTable::new(64),
            }
        }

        fn run(&mut self, line: &str) -> Result<ExecuteResult> {
            let Some(stmt) = parse(line)? else {
                return Ok(ExecuteResult::Noop);
            };
            if stmt.operator.is_mutation() {
                return execute_mutation(&mut self.catalog, &stmt.operator);
            }
            if let Some(id) = index_to_build(&self.catalog, &stmt.operator) {
                self.catalog.column_mut(id)?.ensure_index(4)?;
            }
            execute_query(&self.catalog, &mut self.handles, &stmt)
        }

        fn print(&mut self, line: &str) -> String {
            match self.run(line).unwrap() {
                ExecuteResult::Printed(text) => text,
                other => panic!("expected printed output, got {:?}", other),
            }
        }
    }

    fn grades(dir: &Path) -> Session {
        let mut s = Session::new(dir);
        for line in [
            "create(tbl,\"grades\",db1,2)",
            "create(col,\"project\",db1.grades)",
            "create(col,\"midterm\",db1.grades)",
            "relational_insert(db1.grades,5,1)",
            "relational_insert(db1.grades,15,2)",
            "relational_insert(db1.grades,25,3)",
            "relational_insert(db1.grades,15,4)",
        ] {
            s.run(line).unwrap();
        }
        s
    }

    #[test]
    fn select_fetch_print() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());

        s.run("s=select(db1.grades.project,10,20)").unwrap();
        s.run("f=fetch(db1.grades.midterm,s)").unwrap();

        assert_eq!(s.print("print(f)"), "2\n4");
    }

    #[test]
    fn select_over_fetched_values_keeps_original_positions() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());

        s.run("p=select(db1.grades.project,10,null)").unwrap();
        s.run("v=fetch(db1.grades.midterm,p)").unwrap();
        s.run("q=select(p,v,3,null)").unwrap();
        s.run("m=fetch(db1.grades.project,q)").unwrap();

        assert_eq!(s.print("print(m)"), "25\n15");
    }

    #[test]
    fn aggregates_and_arithmetic() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());

        s.run("a=avg(db1.grades.project)").unwrap();
        s.run("s=select(db1.grades.project,null,null)").unwrap();
        s.run("p=fetch(db1.grades.project,s)").unwrap();
        s.run("m=fetch(db1.grades.midterm,s)").unwrap();
        s.run("d=sub(p,m)").unwrap();
        s.run("x=max(d)").unwrap();

        assert_eq!(s.print("print(a)"), "15.00");
        assert_eq!(s.print("print(d)"), "4\n13\n22\n11");
        assert_eq!(s.print("print(x)"), "22");
    }

    #[test]
    fn join_binds_both_outputs() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());

        s.run("p1=select(db1.grades.project,null,null)").unwrap();
        s.run("v1=fetch(db1.grades.project,p1)").unwrap();
        s.run("p2=select(db1.grades.project,15,16)").unwrap();
        s.run("v2=fetch(db1.grades.project,p2)").unwrap();
        let out = s.run("l,r=join(v1,p1,v2,p2,nested-loop)").unwrap();

        assert_eq!(
            out,
            ExecuteResult::Bound {
                handles: vec!["l".into(), "r".into()]
            }
        );
        assert_eq!(
            s.handles.get("l").unwrap(),
            &GeneralizedColumn::Result(ResultColumn::Positions(vec![1, 1, 3, 3]))
        );
        assert_eq!(
            s.handles.get("r").unwrap(),
            &GeneralizedColumn::Result(ResultColumn::Positions(vec![1, 3, 1, 3]))
        );
    }

    #[test]
    fn declared_index_is_built_and_dropped_on_insert() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());
        s.run("create(idx,db1.grades.project,btree,unclustered)").unwrap();

        s.run("s=select(db1.grades.project,10,20)").unwrap();
        let id = s.catalog.lookup_column("db1.grades.project").unwrap();
        assert!(s.catalog.column(id).unwrap().index().is_some());

        s.run("relational_insert(db1.grades,12,5)").unwrap();
        assert!(s.catalog.column(id).unwrap().index().is_none());

        s.run("s=select(db1.grades.project,10,20)").unwrap();
        s.run("f=fetch(db1.grades.midterm,s)").unwrap();
        assert_eq!(s.print("print(f)"), "2\n4\n5");
    }

    #[test]
    fn error_kinds() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());
        let kind = |s: &mut Session, line: &str| s.run(line).unwrap_err().kind();

        assert_eq!(kind(&mut s, "relational_insert(db1.grades,1)"), ErrorKind::InvalidArgument);
        assert_eq!(
            kind(&mut s, "relational_insert(db1.grades,1,3000000000)"),
            ErrorKind::InvalidArgument
        );
        assert_eq!(kind(&mut s, "s=select(db1.nope.c,1,2)"), ErrorKind::NotFound);
        assert_eq!(kind(&mut s, "a=avg(missing)"), ErrorKind::NotFound);
        assert_eq!(
            kind(&mut s, "create(idx,db1.grades.project,sorted,clustered)"),
            ErrorKind::NotImplemented
        );
        assert_eq!(kind(&mut s, "create(tbl,\"t\",db2,1)"), ErrorKind::NotFound);
        assert_eq!(kind(&mut s, "create(col,\"extra\",db1.grades)"), ErrorKind::Full);

        s.run("a=avg(db1.grades.project)").unwrap();
        assert_eq!(kind(&mut s, "f=fetch(db1.grades.project,a)"), ErrorKind::TypeMismatch);
        s.run("s=select(db1.grades.project,null,null)").unwrap();
        assert_eq!(kind(&mut s, "print(s)"), ErrorKind::TypeMismatch);
    }

    #[test]
    fn failed_query_leaves_handles_untouched() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());
        s.run("s=select(db1.grades.project,null,null)").unwrap();

        assert!(s.run("s=avg(s)").is_err());

        assert!(matches!(
            s.handles.get("s").unwrap(),
            GeneralizedColumn::Result(ResultColumn::Positions(_))
        ));
    }

    #[test]
    fn load_appends_every_column_or_none() {
        let dir = tempdir().unwrap();
        let mut s = grades(dir.path());
        let good = dir.path().join("good.csv");
        let bad = dir.path().join("bad.csv");
        std::fs::write(
            &good,
            "db1.grades.midterm,db1.grades.project\n10,100\n20,200\n",
        )
        .unwrap();
        std::fs::write(&bad, "db1.grades.project,db1.other.c\n1,2\n").unwrap();

        let out = s.run(&format!("load(\"{}\")", good.display())).unwrap();
        assert_eq!(out, ExecuteResult::Inserted { rows: 2 });
        assert_eq!(s.print("print(db1.grades.project)"), "5\n15\n25\n15\n100\n200");

        assert_eq!(
            s.run(&format!("load(\"{}\")", bad.display())).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let t = s.catalog.lookup_table("db1.grades").unwrap();
        assert_eq!(s.catalog.table(t).unwrap().num_rows(), 6);
    }
}
