//! # Storage Module
//!
//! This module provides the storage layer for coldb: one memory-mapped file per
//! stored column, read with zero-copy `&[i32]` slices straight out of the mapping.
//!
//! ## File Layout
//!
//! ```text
//! storage_root/
//! ├── coldb.meta              # Catalog metadata (see schema::persistence)
//! ├── LOCK                    # Exclusive open marker
//! ├── db1.tbl1.col1.col       # Column data (native-endian i32)
//! └── db1.tbl1.col2.col
//! ```
//!
//! Column files are named deterministically from `(database, table, column)`,
//! see [`column_file_name`].
//!
//! ## Safety Model
//!
//! Growing a column remaps its file, which invalidates every slice into the old
//! region. Rather than guarding reads at runtime, the borrow checker enforces it:
//!
//! ```text
//! ColumnFile::values(&self, len) -> &[i32]   // Borrows &self immutably
//! ColumnFile::write_at(&mut self, ..)        // Requires &mut self exclusively
//! ```
//!
//! At the catalog level the same rule is lifted to locks: column data is only
//! borrowed from a read guard, growth only happens under the write guard.

mod mmap;

pub use mmap::ColumnFile;

use crate::config::COLUMN_FILE_EXTENSION;
use crate::config::FALLBACK_PAGE_SIZE;

/// OS memory page size, used to round column mappings.
pub fn os_page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions; a non-positive result means
        // the value is unavailable and we fall back.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    FALLBACK_PAGE_SIZE
}

/// File name of the backing file for `db.table.column`.
pub fn column_file_name(db: &str, table: &str, column: &str) -> String {
    format!("{}.{}.{}.{}", db, table, column, COLUMN_FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_positive_multiple_of_element() {
        let page = os_page_size();
        assert!(page > 0);
        assert_eq!(page % crate::config::ELEMENT_SIZE, 0);
    }

    #[test]
    fn column_file_name_is_qualified() {
        assert_eq!(column_file_name("db1", "tbl1", "col1"), "db1.tbl1.col1.col");
    }
}
