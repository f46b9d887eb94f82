//! # coldb CLI
//!
//! Interactive and scripted front end for a [`Database`](crate::Database).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      bin/coldb.rs                           │
//! │        args, logging, storage root, script or REPL          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 REPL / script runner                        │
//! │  - reads lines (rustyline for the REPL)                     │
//! │  - dot commands or Database::execute                        │
//! │  - prints `print` output                                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │     Commands          │    Table Formatter    │   History   │
//! │  (.tables, .columns,  │  ASCII listings       │ COLDB_      │
//! │   .handles, .help)    │                       │ HISTORY     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! coldb                      # REPL over ./disk
//! coldb -d /var/coldb        # REPL over another storage root
//! coldb queries.dsl          # run a script, print output to stdout
//! ```

pub mod commands;
pub mod history;
pub mod repl;
pub mod table;

pub use repl::{run_script, Repl};
