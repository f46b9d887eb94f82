//! # coldb Configuration Constants
//!
//! This module centralizes configuration constants, grouping interdependent
//! values together and documenting their relationships.
//!
//! ## Dependency Graph
//!
//! ```text
//! ELEMENT_SIZE (4 bytes, i32)
//!       │
//!       └─> column file growth: (offset + len) * ELEMENT_SIZE, rounded up to
//!           the OS page size (see storage::os_page_size)
//!
//! MAX_NAME_LEN (64 bytes)
//!       │
//!       ├─> database / table / column names
//!       └─> handle names in the handle table
//!
//! MIN_INDEX_FANOUT (2)
//!       │
//!       └─> DEFAULT_INDEX_FANOUT (must be >=)
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `DEFAULT_INDEX_FANOUT >= MIN_INDEX_FANOUT` (a fanout of 1 never shrinks a level)
//! 2. `FALLBACK_PAGE_SIZE` is a multiple of `ELEMENT_SIZE` (page-rounded regions hold
//!    whole elements)

// ============================================================================
// COLUMN STORAGE
// ============================================================================

/// Size in bytes of one stored element. Base columns hold `i32`.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<i32>();

/// Page size used when the OS cannot be queried.
pub const FALLBACK_PAGE_SIZE: usize = 4096;

const _: () = assert!(
    FALLBACK_PAGE_SIZE % ELEMENT_SIZE == 0,
    "page-rounded regions must hold a whole number of elements"
);

// ============================================================================
// NAMING
// ============================================================================

/// Maximum length in bytes of a database, table, column or handle name.
pub const MAX_NAME_LEN: usize = 64;

/// Separator used in qualified names (`db.table.column`).
pub const NAME_SEPARATOR: char = '.';

// ============================================================================
// CATALOG GROWTH
// ============================================================================

/// Initial table slot reservation for a new database.
pub const INITIAL_TABLE_CAPACITY: usize = 4;

/// Largest column count a table may declare.
pub const MAX_TABLE_COLUMNS: usize = 1024;

// ============================================================================
// INDEX CONFIGURATION
// ============================================================================

/// Smallest fanout that still produces a shrinking level hierarchy.
pub const MIN_INDEX_FANOUT: usize = 2;

/// Default number of keys per internal node group.
/// 64 keys of 4 bytes fill four 64-byte cache lines per node scan.
pub const DEFAULT_INDEX_FANOUT: usize = 64;

const _: () = assert!(
    DEFAULT_INDEX_FANOUT >= MIN_INDEX_FANOUT,
    "DEFAULT_INDEX_FANOUT must be >= MIN_INDEX_FANOUT"
);

// ============================================================================
// HANDLE TABLE
// ============================================================================

/// Default cap on live entries in the handle table.
pub const DEFAULT_HANDLE_CAPACITY: usize = 4096;

/// Initial slot reservation for the handle table; grows by doubling.
pub const INITIAL_HANDLE_SLOTS: usize = 16;

const _: () = assert!(
    INITIAL_HANDLE_SLOTS <= DEFAULT_HANDLE_CAPACITY,
    "initial handle slots cannot exceed the handle capacity"
);

// ============================================================================
// FILE LAYOUT
// ============================================================================

/// Catalog metadata file at the storage root.
pub const META_FILE_NAME: &str = "coldb.meta";

/// Extension of per-column backing files (`db.table.column.col`).
pub const COLUMN_FILE_EXTENSION: &str = "col";

/// Exclusive open marker at the storage root.
pub const LOCK_FILE_NAME: &str = "LOCK";

/// Storage root used by the binary when none is configured.
pub const DEFAULT_DATA_DIR: &str = "disk";

/// Size in bytes of the fixed metadata file header.
pub const META_HEADER_SIZE: usize = 64;
