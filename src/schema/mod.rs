//! # Catalog
//!
//! This module implements the in-memory Database → Table → Column hierarchy and
//! its persistence.
//!
//! ## Hierarchy
//!
//! ```text
//! Catalog "db1"                     (one open database per storage root)
//! ├── Table "tbl1"  capacity 3
//! │   ├── Column "col1"  -> db1.tbl1.col1.col
//! │   ├── Column "col2"  -> db1.tbl1.col2.col
//! │   └── (free slot)
//! └── Table "tbl2"  capacity 1
//!     └── Column "x"     -> db1.tbl2.x.col
//! ```
//!
//! ## Name Resolution
//!
//! Columns are addressed as `db.table.column` and tables as `db.table`, with
//! exactly the expected number of separators. Resolution is a linear scan of
//! tables and then columns; catalogs are small and lookups happen once per
//! statement, not per row. A resolved column is a [`ColumnId`] (table slot,
//! column slot), which stays valid because tables and columns are never dropped.
//!
//! ## Names
//!
//! Database, table, column and handle names are 1 to `MAX_NAME_LEN` bytes of
//! ASCII letters, digits, `_` and `-`. The separator `.` is never part of a name.

mod catalog;
mod column;
pub mod persistence;
mod table;

pub use catalog::{Catalog, ColumnId};
pub use column::{Column, ElementType};
pub use persistence::{LoadReport, PersistReport};
pub use table::Table;

use crate::config::MAX_NAME_LEN;
use crate::error::{Error, Result};

/// Checks a single (unqualified) name. `kind` only feeds the error message.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument(format!("{} name is empty", kind)));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidArgument(format!(
            "{} name '{}' exceeds {} bytes",
            kind, name, MAX_NAME_LEN
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(Error::InvalidArgument(format!(
            "{} name '{}' contains invalid characters",
            kind, name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_name_accepts_identifiers() {
        assert!(validate_name("table", "tbl_1").is_ok());
        assert!(validate_name("table", &"a".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn validate_name_rejects_bad_names() {
        for bad in ["", "a.b", "a b", "q\"", &"a".repeat(MAX_NAME_LEN + 1)] {
            assert!(validate_name("column", bad).is_err(), "{:?}", bad);
        }
    }
}
