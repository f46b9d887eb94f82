//! # Catalog Persistence
//!
//! This module implements serialization and deserialization of the catalog
//! to and from the `coldb.meta` file, and re-attaching each column to its
//! backing file at startup.
//!
//! ## File Format
//!
//! ```text
//! +-------------------+ Offset 0
//! | File Header       |
//! | (64 bytes)        |
//! +-------------------+ Offset 64
//! | Catalog Body      |
//! | (body_len bytes)  |
//! +-------------------+
//! ```
//!
//! ### File Header Format
//!
//! ```text
//! Offset  Size  Description
//! 0       16    Magic: "coldb meta v1\0\0\0"
//! 16      4     Version: 1 (u32 little-endian)
//! 20      4     Table count (u32 little-endian)
//! 24      8     Body length in bytes (u64 little-endian)
//! 32      32    Reserved
//! ```
//!
//! ### Catalog Body Format
//!
//! Strings are a `u16` little-endian byte length followed by UTF-8 bytes.
//!
//! ```text
//! database name: string
//! For each table (table_count):
//!   - name: string
//!   - capacity: u32
//!   - column_count: u32
//!   - For each column:
//!       - name: string
//!       - element type: u8 (1 = i32)
//!       - sorted hint: u8 (0 or 1)
//!       - index kind: u8 (0 = none, 1 = sorted, 2 = btree)
//!       - num_elements: u64
//!       - min: i64
//!       - max: i64
//!       - sum: i64
//! ```
//!
//! ## Error Handling
//!
//! Any malformed record (truncation, bad magic or version, invalid UTF-8, unknown
//! tag, trailing bytes) aborts loading with `CorruptMetadata`. So does a table
//! or column count that the remaining body bytes cannot hold. Column files are
//! a softer matter: a missing or unmappable file leaves that column without data
//! and adds a warning to the `LoadReport`, so the rest of the database loads.

use std::fs;
use std::path::Path;

use eyre::WrapErr;
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::catalog::Catalog;
use super::column::{Column, ElementType};
use super::table::Table;
use super::validate_name;
use crate::btree::IndexKind;
use crate::config::{MAX_TABLE_COLUMNS, META_FILE_NAME, META_HEADER_SIZE};
use crate::error::{Error, Result};
use crate::storage::{column_file_name, ColumnFile};

pub const META_MAGIC: &[u8; 16] = b"coldb meta v1\x00\x00\x00";
pub const CURRENT_VERSION: u32 = 1;

/// Outcome of loading a catalog from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: usize,
    pub columns: usize,
    /// One entry per column whose data could not be re-attached.
    pub warnings: Vec<String>,
}

/// Outcome of `Catalog::persist_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub columns_flushed: usize,
    /// One entry per column that failed to flush.
    pub failures: Vec<String>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MetaHeader {
    magic: [u8; 16],
    version: U32,
    table_count: U32,
    body_len: U64,
    reserved: [u8; 32],
}

const _: () = assert!(std::mem::size_of::<MetaHeader>() == META_HEADER_SIZE);

impl MetaHeader {
    /// Header with the magic set and every counter zero.
    pub fn empty() -> Self {
        Self {
            magic: *META_MAGIC,
            version: U32::new(0),
            table_count: U32::new(0),
            body_len: U64::new(0),
            reserved: [0u8; 32],
        }
    }

    pub fn new(table_count: u32, body_len: u64) -> Self {
        Self::empty()
            .with_version(CURRENT_VERSION)
            .with_table_count(table_count)
            .with_body_len(body_len)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        if bytes.len() < META_HEADER_SIZE {
            return Err(corrupt(format!(
                "file of {} bytes is shorter than the {}-byte header",
                bytes.len(),
                META_HEADER_SIZE
            )));
        }

        let header = Self::ref_from_bytes(&bytes[..META_HEADER_SIZE])
            .map_err(|e| corrupt(format!("failed to parse header: {:?}", e)))?;

        if &header.magic != META_MAGIC {
            return Err(corrupt("invalid magic bytes"));
        }
        if header.version() != CURRENT_VERSION {
            return Err(corrupt(format!(
                "unsupported version {} (expected {})",
                header.version(),
                CURRENT_VERSION
            )));
        }

        Ok(header)
    }

    le_fields! {
        version: U32 => u32,
        table_count: U32 => u32,
        body_len: U64 => u64,
    }
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::CorruptMetadata(msg.into())
}

/// Serializes the catalog structure and column statistics.
pub fn encode(catalog: &Catalog) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    put_str(&mut body, catalog.name())?;

    for table in catalog.tables() {
        put_str(&mut body, table.name())?;
        body.extend((table.capacity() as u32).to_le_bytes());
        body.extend((table.columns().len() as u32).to_le_bytes());

        for column in table.columns() {
            put_str(&mut body, column.name())?;
            body.push(column.elem_type().tag());
            body.push(column.is_sorted() as u8);
            body.push(column.index_kind().map_or(0, IndexKind::tag));
            body.extend((column.num_elements() as u64).to_le_bytes());

            let (min, max, sum) = column.raw_stats();
            body.extend(min.to_le_bytes());
            body.extend(max.to_le_bytes());
            body.extend(sum.to_le_bytes());
        }
    }

    let header = MetaHeader::new(catalog.tables().len() as u32, body.len() as u64);
    let mut out = Vec::with_capacity(META_HEADER_SIZE + body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend(body);
    Ok(out)
}

fn put_str(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(Error::InvalidArgument(format!(
            "name '{}' is too long to persist",
            s
        )));
    }
    buf.extend((bytes.len() as u16).to_le_bytes());
    buf.extend(bytes);
    Ok(())
}

/// Writes `coldb.meta` under the catalog's root, replacing any previous file.
pub(crate) fn write_metadata(catalog: &Catalog) -> Result<()> {
    let bytes = encode(catalog)?;
    let path = catalog.root().join(META_FILE_NAME);
    let tmp = path.with_extension("meta.tmp");

    fs::write(&tmp, &bytes)
        .wrap_err_with(|| format!("failed to write metadata file '{}'", tmp.display()))?;
    fs::rename(&tmp, &path).wrap_err_with(|| {
        format!(
            "failed to move '{}' into place at '{}'",
            tmp.display(),
            path.display()
        )
    })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote metadata");
    Ok(())
}

/// Smallest encoding of a table record: a one-byte name, capacity and column count.
const MIN_TABLE_RECORD: usize = 2 + 1 + 4 + 4;

/// Smallest encoding of a column record: a one-byte name, three tag bytes,
/// the element count and the three statistics.
const MIN_COLUMN_RECORD: usize = 2 + 1 + 3 + 8 * 4;

/// Rebuilds the catalog described by `bytes`, with every column unattached.
pub fn decode(bytes: &[u8], root: &Path) -> Result<Catalog> {
    let header = MetaHeader::from_bytes(bytes)?;
    let body = &bytes[META_HEADER_SIZE..];

    if header.body_len() != body.len() as u64 {
        return Err(corrupt(format!(
            "body length {} does not match header {}",
            body.len(),
            header.body_len()
        )));
    }

    let mut reader = Reader { bytes: body, pos: 0 };
    let db = reader.name("database")?;

    let table_count = header.table_count() as usize;
    reader.expect_records(table_count, MIN_TABLE_RECORD, "tables")?;

    let mut tables = Vec::new();
    for _ in 0..table_count {
        let name = reader.name("table")?;
        let capacity = reader.u32("table capacity")? as usize;
        let column_count = reader.u32("column count")? as usize;

        if capacity < 1 || capacity > MAX_TABLE_COLUMNS || column_count > capacity {
            return Err(corrupt(format!(
                "table '{}' has {} columns for {} slots",
                name, column_count, capacity
            )));
        }

        reader.expect_records(column_count, MIN_COLUMN_RECORD, "columns")?;

        let mut columns = Vec::new();
        for _ in 0..column_count {
            let col_name = reader.name("column")?;
            let elem_type = ElementType::from_tag(reader.u8("element type")?)?;
            let sorted = reader.u8("sorted hint")? != 0;
            let index_kind = IndexKind::from_tag(reader.u8("index kind")?)?;
            let num_elements = usize::try_from(reader.u64("element count")?)
                .map_err(|_| corrupt(format!("column '{}' element count overflows", col_name)))?;
            let min = reader.i64("min")?;
            let max = reader.i64("max")?;
            let sum = reader.i64("sum")?;

            if num_elements > 0 && min > max {
                return Err(corrupt(format!(
                    "column '{}' has min {} > max {}",
                    col_name, min, max
                )));
            }

            let path = root.join(column_file_name(&db, &name, &col_name));
            columns.push(Column::from_metadata(
                col_name,
                elem_type,
                sorted,
                index_kind,
                num_elements,
                (min, max, sum),
                path,
            ));
        }

        tables.push(Table::from_columns(name, capacity, columns));
    }

    if reader.pos != body.len() {
        return Err(corrupt(format!(
            "{} trailing bytes after last table",
            body.len() - reader.pos
        )));
    }

    Ok(Catalog::from_tables(db, root.to_path_buf(), tables))
}

/// Loads the catalog stored under `root`, if there is one.
pub fn load(root: &Path) -> Result<Option<(Catalog, LoadReport)>> {
    let path = root.join(META_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(&path)
        .wrap_err_with(|| format!("failed to read metadata file '{}'", path.display()))?;
    let mut catalog = decode(&bytes, root)?;
    let report = attach_columns(&mut catalog);

    tracing::info!(
        db = %catalog.name(),
        tables = report.tables,
        columns = report.columns,
        warnings = report.warnings.len(),
        "loaded database"
    );
    Ok(Some((catalog, report)))
}

fn attach_columns(catalog: &mut Catalog) -> LoadReport {
    let mut report = LoadReport {
        tables: catalog.tables().len(),
        ..LoadReport::default()
    };

    for t in 0..catalog.tables().len() {
        let Ok(table) = catalog.table_mut(t) else {
            continue;
        };
        for column in table.columns_mut() {
            report.columns += 1;
            if column.num_elements() == 0 && !column.path().exists() {
                continue;
            }
            match ColumnFile::open(column.path(), column.num_elements()) {
                Ok(file) => column.attach_file(file),
                Err(e) => {
                    tracing::warn!(
                        column = %column.name(),
                        error = %format!("{:#}", e),
                        "column data unavailable"
                    );
                    report
                        .warnings
                        .push(format!("{}: {:#}", column.path().display(), e));
                }
            }
        }
    }

    report
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(corrupt(format!("unexpected end of data reading {}", what)));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Fails unless `count` records of at least `min_len` bytes can still follow.
    fn expect_records(&self, count: usize, min_len: usize, what: &str) -> Result<()> {
        let remaining = self.bytes.len() - self.pos;
        if count.saturating_mul(min_len) > remaining {
            return Err(corrupt(format!(
                "{} {} cannot fit in the {} remaining bytes",
                count, what, remaining
            )));
        }
        Ok(())
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array(what)?))
    }

    fn i64(&mut self, what: &str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array(what)?))
    }

    fn name(&mut self, what: &str) -> Result<String> {
        let len = u16::from_le_bytes(self.array(what)?) as usize;
        let raw = self.take(len, what)?;
        let name = std::str::from_utf8(raw)
            .map_err(|e| corrupt(format!("invalid UTF-8 in {} name: {}", what, e)))?
            .to_string();
        validate_name(what, &name).map_err(|e| corrupt(e.to_string()))?;
        Ok(name)
    }
}
