//! # Database Context
//!
//! [`Database`] is the entry point: it owns the storage root, the open catalog
//! and the handle table, and runs query-language statements against them.
//!
//! ## Architecture
//!
//! ```text
//! Database (Clone, cheap)
//!     │ Arc
//!     ▼
//! SharedDatabase
//!     ├── catalog: RwLock<Option<Catalog>>   one mutual-exclusion domain
//!     ├── handles: Mutex<HandleTable>        named intermediate results
//!     ├── lock:    Mutex<Option<LockFile>>   exclusive claim on the root
//!     └── config:  index fanout, handle capacity
//! ```
//!
//! The catalog is `None` until `create(db,..)` runs or a persisted database is
//! loaded at open. At most one database lives under a storage root, and the
//! `LOCK` file keeps a second process (or a second `Database::open` in the same
//! process) from opening the root while this one is alive.
//!
//! ## Locking
//!
//! Catalog mutations (`create`, `relational_insert`, `load`, persist) take the
//! catalog write lock. Queries take the read lock and borrow column data from
//! the guard, so a slice into a column mapping cannot outlive the guard and no
//! growth can happen while one is held. A select that needs a declared index
//! built takes the write lock first, builds, then downgrades to a read lock.
//!
//! Lock order is catalog, then handle table.
//!
//! ## Usage
//!
//! ```ignore
//! let db = Database::builder().path("./disk").open()?;
//! db.execute("create(db,\"db1\")")?;
//! db.execute("create(tbl,\"t\",db1,1)")?;
//! db.execute("create(col,\"c\",db1.t)")?;
//! db.execute("relational_insert(db1.t,42)")?;
//! db.execute("s=select(db1.t.c,null,100)")?;
//! let out = db.execute("print(s)")?;
//! ```

mod builder;
mod lifecycle;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::query::executor::{self, ExecuteResult};
use crate::query::{parse, GeneralizedColumn, HandleTable, Operator, Statement};
use crate::schema::{Catalog, LoadReport};

pub use builder::DatabaseBuilder;
use lifecycle::LockFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub index_fanout: usize,
    pub handle_capacity: usize,
}

pub(crate) struct SharedDatabase {
    pub(crate) root: PathBuf,
    pub(crate) config: DatabaseConfig,
    pub(crate) catalog: RwLock<Option<Catalog>>,
    pub(crate) handles: Mutex<HandleTable>,
    pub(crate) load_report: Option<LoadReport>,
    pub(crate) closed: AtomicBool,
    pub(crate) lock: Mutex<Option<LockFile>>,
}

#[derive(Clone)]
pub struct Database {
    pub(crate) shared: Arc<SharedDatabase>,
}

/// One live handle, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleSummary {
    pub name: String,
    pub kind: &'static str,
    pub len: usize,
}

fn no_database() -> Error {
    Error::NotFound("no active database; run create(db,\"NAME\") first".into())
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Opens the storage root at `path` with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().path(path).open()
    }

    pub fn path(&self) -> &Path {
        &self.shared.root
    }

    pub fn config(&self) -> DatabaseConfig {
        self.shared.config
    }

    /// What loading the persisted catalog found at open, if there was one.
    pub fn load_report(&self) -> Option<&LoadReport> {
        self.shared.load_report.as_ref()
    }

    /// Name of the active database.
    pub fn database_name(&self) -> Option<String> {
        self.shared
            .catalog
            .read()
            .as_ref()
            .map(|c| c.name().to_string())
    }

    pub fn create_database(&self, name: &str) -> Result<()> {
        self.ensure_open()?;
        let mut guard = self.shared.catalog.write();

        if let Some(active) = guard.as_ref() {
            return Err(Error::AlreadyExists(format!(
                "database '{}' is already active",
                active.name()
            )));
        }
        if lifecycle::has_metadata(&self.shared.root) {
            return Err(Error::AlreadyExists(format!(
                "a database is already stored under '{}'",
                self.shared.root.display()
            )));
        }

        *guard = Some(Catalog::new(name, &self.shared.root)?);
        tracing::info!(db = name, root = %self.shared.root.display(), "created database");
        Ok(())
    }

    /// Parses and runs one line of the query language.
    pub fn execute(&self, line: &str) -> Result<ExecuteResult> {
        match parse(line)? {
            Some(statement) => self.execute_statement(&statement),
            None => Ok(ExecuteResult::Noop),
        }
    }

    pub fn execute_statement(&self, statement: &Statement) -> Result<ExecuteResult> {
        self.ensure_open()?;

        match &statement.operator {
            Operator::CreateDatabase { name } => {
                self.create_database(name)?;
                Ok(ExecuteResult::Created {
                    object: "database",
                    name: name.clone(),
                })
            }
            Operator::Shutdown => Ok(ExecuteResult::Shutdown(self.close()?)),
            op if op.is_mutation() => {
                let mut guard = self.shared.catalog.write();
                let catalog = guard.as_mut().ok_or_else(no_database)?;
                executor::execute_mutation(catalog, op)
            }
            op => {
                let mut guard = self.shared.catalog.read();
                if let Some(id) = guard.as_ref().and_then(|c| executor::index_to_build(c, op)) {
                    drop(guard);
                    let mut write = self.shared.catalog.write();
                    if let Some(catalog) = write.as_mut() {
                        catalog
                            .column_mut(id)?
                            .ensure_index(self.shared.config.index_fanout)?;
                    }
                    guard = RwLockWriteGuard::downgrade(write);
                }

                let catalog = guard.as_ref().ok_or_else(no_database)?;
                let mut handles = self.shared.handles.lock();
                executor::execute_query(catalog, &mut handles, statement)
            }
        }
    }

    /// Binds `handle` to the stored column `db.table.column`.
    pub fn bind_column(&self, handle: &str, column: &str) -> Result<()> {
        self.ensure_open()?;
        let guard = self.shared.catalog.read();
        let catalog = guard.as_ref().ok_or_else(no_database)?;
        let id = catalog.lookup_column(column)?;

        self.shared
            .handles
            .lock()
            .insert(handle, GeneralizedColumn::Raw(id))
    }

    /// A copy of the value bound to `name`.
    pub fn handle(&self, name: &str) -> Result<GeneralizedColumn> {
        self.shared.handles.lock().get(name).cloned()
    }

    /// Live handles, most recent first.
    pub fn handles(&self) -> Result<Vec<HandleSummary>> {
        let guard = self.shared.catalog.read();
        let handles = self.shared.handles.lock();

        handles
            .iter()
            .map(|(name, value)| {
                let len = match (value, guard.as_ref()) {
                    (GeneralizedColumn::Result(r), _) => r.len(),
                    (GeneralizedColumn::Raw(_), Some(catalog)) => value.len(catalog)?,
                    (GeneralizedColumn::Raw(_), None) => 0,
                };
                Ok(HandleSummary {
                    name: name.to_string(),
                    kind: value.type_name(),
                    len,
                })
            })
            .collect()
    }

    /// Runs `f` against the active catalog under the read lock.
    pub fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> Result<R> {
        let guard = self.shared.catalog.read();
        guard.as_ref().map(f).ok_or_else(no_database)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}
