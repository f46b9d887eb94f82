//! # coldb - Memory-Mapped Column Store
//!
//! coldb is a small column-oriented database driven by a line-oriented query
//! language. Every column is a file of native-endian `i32` values mapped into
//! memory; queries produce position lists and value vectors that are bound to
//! named handles and composed by later statements.
//!
//! ## Quick Start
//!
//! ```ignore
//! use coldb::Database;
//!
//! let db = Database::builder()
//!     .path("./disk")
//!     .index_fanout(64)
//!     .open()?;
//!
//! db.execute(r#"create(db,"db1")"#)?;
//! db.execute(r#"create(tbl,"grades",db1,1)"#)?;
//! db.execute(r#"create(col,"score",db1.grades)"#)?;
//! db.execute("relational_insert(db1.grades,15)")?;
//!
//! db.execute("s=select(db1.grades.score,10,20)")?;
//! db.execute("f=fetch(db1.grades.score,s)")?;
//! let out = db.execute("print(f)")?;
//! assert_eq!(out.output(), Some("15"));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   CLI (REPL / script runner)        │
//! ├─────────────────────────────────────┤
//! │   Public API (Database)             │
//! ├─────────────────────────────────────┤
//! │   Query Layer (parser / executor)   │
//! │   handles: named intermediates      │
//! ├──────────────────┬──────────────────┤
//! │  Schema/Catalog  │  Column Indexes  │
//! │  + persistence   │  (sorted/B-tree) │
//! ├──────────────────┴──────────────────┤
//! │   Memory-Mapped Column Files        │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! disk/
//! ├── coldb.meta             # catalog structure and column statistics
//! ├── LOCK                   # pid of the owning process
//! ├── db1.grades.score.col   # raw i32 values, one file per column
//! └── db1.grades.id.col
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: growable memory-mapped column files
//! - [`schema`]: catalog, tables, columns, metadata persistence
//! - [`btree`]: sorted projections and static B-trees over columns
//! - [`query`]: parser, operators, handle table, executor
//! - [`database`]: shared handle with locking and lifecycle
//! - [`cli`]: REPL, dot commands, script runner

#[macro_use]
mod macros;

pub mod btree;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod query;
pub mod schema;
pub mod storage;

pub use database::{Database, DatabaseBuilder, DatabaseConfig, HandleSummary};
pub use error::{Error, ErrorKind, Result};
pub use query::ExecuteResult;
