//! # Database Builder
//!
//! `DatabaseBuilder` configures and opens a storage root.
//!
//! | Option          | Default | Description                                  |
//! |-----------------|---------|----------------------------------------------|
//! | path            | none    | Storage root; created if missing (required)  |
//! | index_fanout    | 64      | Keys per node of the static B-tree index     |
//! | handle_capacity | 4096    | Live handle names allowed at once            |
//!
//! ```ignore
//! let db = Database::builder()
//!     .path("./disk")
//!     .index_fanout(16)
//!     .open()?;
//! ```
//!
//! `open()` claims the root's `LOCK` file, then loads the persisted catalog if
//! the root holds one. A root without metadata opens with no active database.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use eyre::WrapErr;
use parking_lot::{Mutex, RwLock};

use super::lifecycle::LockFile;
use super::{Database, DatabaseConfig, SharedDatabase};
use crate::config::{DEFAULT_HANDLE_CAPACITY, DEFAULT_INDEX_FANOUT, MIN_INDEX_FANOUT};
use crate::error::{Error, Result};
use crate::query::HandleTable;
use crate::schema::persistence;

pub struct DatabaseBuilder {
    path: Option<PathBuf>,
    index_fanout: usize,
    handle_capacity: usize,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            index_fanout: DEFAULT_INDEX_FANOUT,
            handle_capacity: DEFAULT_HANDLE_CAPACITY,
        }
    }

    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn index_fanout(mut self, fanout: usize) -> Self {
        self.index_fanout = fanout;
        self
    }

    pub fn handle_capacity(mut self, capacity: usize) -> Self {
        self.handle_capacity = capacity;
        self
    }

    pub fn open(self) -> Result<Database> {
        let root = self.path.ok_or_else(|| {
            Error::InvalidArgument("storage path not specified: call .path() first".into())
        })?;
        if self.index_fanout < MIN_INDEX_FANOUT {
            return Err(Error::InvalidArgument(format!(
                "index fanout must be at least {}, got {}",
                MIN_INDEX_FANOUT, self.index_fanout
            )));
        }
        if self.handle_capacity == 0 {
            return Err(Error::InvalidArgument(
                "handle capacity must be at least 1".into(),
            ));
        }

        fs::create_dir_all(&root)
            .wrap_err_with(|| format!("failed to create storage root '{}'", root.display()))?;

        let lock = LockFile::acquire(&root)?;
        let (catalog, load_report) = match persistence::load(&root)? {
            Some((catalog, report)) => (Some(catalog), Some(report)),
            None => (None, None),
        };

        tracing::debug!(
            root = %root.display(),
            loaded = catalog.is_some(),
            fanout = self.index_fanout,
            "opened storage root"
        );

        Ok(Database {
            shared: Arc::new(SharedDatabase {
                root,
                config: DatabaseConfig {
                    index_fanout: self.index_fanout,
                    handle_capacity: self.handle_capacity,
                },
                catalog: RwLock::new(catalog),
                handles: Mutex::new(HandleTable::new(self.handle_capacity)),
                load_report,
                closed: AtomicBool::new(false),
                lock: Mutex::new(Some(lock)),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn open_without_path_fails() {
        let err = DatabaseBuilder::new().open().err().unwrap();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("storage path not specified"));
    }

    #[test]
    fn fanout_below_two_is_invalid() {
        let dir = tempdir().unwrap();

        let err = DatabaseBuilder::new()
            .path(dir.path())
            .index_fanout(1)
            .open()
            .err()
            .unwrap();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn open_creates_missing_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("disk");

        let db = DatabaseBuilder::new()
            .path(&root)
            .handle_capacity(8)
            .open()
            .unwrap();

        assert!(root.is_dir());
        assert_eq!(db.config().handle_capacity, 8);
        assert_eq!(db.config().index_fanout, DEFAULT_INDEX_FANOUT);
        assert!(db.load_report().is_none());
    }

    #[test]
    fn handle_capacity_is_enforced() {
        let dir = tempdir().unwrap();
        let db = DatabaseBuilder::new()
            .path(dir.path())
            .handle_capacity(1)
            .open()
            .unwrap();
        db.execute("create(db,\"db1\")").unwrap();
        db.execute("create(tbl,\"t\",db1,1)").unwrap();
        db.execute("create(col,\"c\",db1.t)").unwrap();
        db.execute("a=select(db1.t.c,null,null)").unwrap();

        let err = db.execute("b=select(db1.t.c,null,null)").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }
}
