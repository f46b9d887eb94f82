//! # Lifecycle
//!
//! Persisting and closing a database, and the `LOCK` file that marks a storage
//! root as open.
//!
//! ## Close
//!
//! `close()` (and the `shutdown` statement) flushes every dirty column, rewrites
//! the metadata file, releases the handle table and marks the database closed;
//! every later call fails with `Closed`. Dropping the last `Database` clone
//! without closing persists the same way, logging instead of returning errors.
//!
//! ## Lock File
//!
//! `LOCK` is created with `create_new` and holds the owner's process id. A lock
//! whose process no longer exists is stale and is taken over; a live one makes
//! `open()` fail with `AlreadyExists`. The file is removed when the database
//! closes or drops.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use eyre::WrapErr;

use super::{Database, SharedDatabase};
use crate::config::{LOCK_FILE_NAME, META_FILE_NAME};
use crate::error::{Error, Result};
use crate::schema::PersistReport;

pub(crate) fn has_metadata(root: &Path) -> bool {
    root.join(META_FILE_NAME).exists()
}

#[derive(Debug)]
pub(crate) struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub(crate) fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE_NAME);

        match Self::create(&path) {
            Err(Error::AlreadyExists(msg)) => {
                let owner = fs::read_to_string(&path)
                    .ok()
                    .and_then(|s| s.trim().parse::<i32>().ok());
                match owner {
                    Some(pid) if !process_alive(pid) => {
                        tracing::warn!(path = %path.display(), pid, "removing stale lock");
                        fs::remove_file(&path).wrap_err_with(|| {
                            format!("failed to remove stale lock '{}'", path.display())
                        })?;
                        Self::create(&path)
                    }
                    _ => Err(Error::AlreadyExists(msg)),
                }
            }
            other => other,
        }
    }

    fn create(path: &Path) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                return Err(Error::AlreadyExists(format!(
                    "storage root is locked by another instance ('{}')",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(eyre::Report::new(e)
                    .wrap_err(format!("failed to create lock file '{}'", path.display()))
                    .into());
            }
        };

        write!(file, "{}", std::process::id())
            .wrap_err_with(|| format!("failed to write lock file '{}'", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 only checks that the process exists; nothing is delivered.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

impl Database {
    /// Flushes dirty columns and rewrites the metadata file.
    pub fn persist(&self) -> Result<PersistReport> {
        self.ensure_open()?;
        let mut guard = self.shared.catalog.write();
        match guard.as_mut() {
            Some(catalog) => catalog.persist_all(),
            None => Ok(PersistReport::default()),
        }
    }

    /// Persists, releases the handle table and the lock, and closes.
    pub fn close(&self) -> Result<PersistReport> {
        if self
            .shared
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Closed);
        }

        let report = {
            let mut guard = self.shared.catalog.write();
            match guard.as_mut() {
                Some(catalog) => catalog.persist_all(),
                None => Ok(PersistReport::default()),
            }
        };
        self.shared.handles.lock().clear();
        self.shared.lock.lock().take();

        tracing::info!(root = %self.shared.root.display(), "closed database");
        report
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl Drop for SharedDatabase {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Some(catalog) = self.catalog.get_mut().as_mut() {
            if let Err(e) = catalog.persist_all() {
                tracing::warn!(error = %e, "failed to persist database on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn second_open_of_same_root_is_refused() {
        let dir = tempdir().unwrap();
        let _db = Database::open(dir.path()).unwrap();

        let err = Database::open(dir.path()).err().unwrap();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn lock_is_released_on_close_and_drop() {
        let dir = tempdir().unwrap();

        let db = Database::open(dir.path()).unwrap();
        assert!(dir.path().join(LOCK_FILE_NAME).exists());
        db.close().unwrap();
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());

        let db = Database::open(dir.path()).unwrap();
        drop(db);
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
        Database::open(dir.path()).unwrap();
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(LOCK_FILE_NAME), format!("{}", i32::MAX)).unwrap();

        let db = Database::open(dir.path()).unwrap();

        let owner = fs::read_to_string(dir.path().join(LOCK_FILE_NAME)).unwrap();
        assert_eq!(owner, std::process::id().to_string());
        drop(db);
    }

    #[test]
    fn closed_database_rejects_statements() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();
        db.execute("create(db,\"db1\")").unwrap();

        let out = db.execute("shutdown").unwrap();

        assert!(matches!(out, crate::query::ExecuteResult::Shutdown(_)));
        assert!(db.is_closed());
        assert_eq!(db.execute("create(tbl,\"t\",db1,1)").unwrap_err().kind(), ErrorKind::Closed);
        assert_eq!(db.close().unwrap_err().kind(), ErrorKind::Closed);
        assert!(dir.path().join(META_FILE_NAME).exists());
    }

    #[test]
    fn drop_persists_unclosed_database() {
        let dir = tempdir().unwrap();
        {
            let db = Database::open(dir.path()).unwrap();
            db.execute("create(db,\"db1\")").unwrap();
            db.execute("create(tbl,\"t\",db1,1)").unwrap();
        }

        let db = Database::open(dir.path()).unwrap();

        assert_eq!(db.database_name().as_deref(), Some("db1"));
        assert_eq!(db.load_report().unwrap().tables, 1);
    }
}
