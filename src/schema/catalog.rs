use std::path::{Path, PathBuf};

use super::column::Column;
use super::persistence::{self, PersistReport};
use super::table::Table;
use super::validate_name;
use crate::config::{INITIAL_TABLE_CAPACITY, MAX_TABLE_COLUMNS, NAME_SEPARATOR};
use crate::error::{Error, Result};

/// Resolved address of a stored column: table slot then column slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId {
    pub table: usize,
    pub column: usize,
}

/// The open database: its name, storage root and tables.
#[derive(Debug)]
pub struct Catalog {
    name: String,
    root: PathBuf,
    tables: Vec<Table>,
}

impl Catalog {
    pub(crate) fn new(name: &str, root: &Path) -> Result<Self> {
        validate_name("database", name)?;
        Ok(Self {
            name: name.to_string(),
            root: root.to_path_buf(),
            tables: Vec::with_capacity(INITIAL_TABLE_CAPACITY),
        })
    }

    pub(crate) fn from_tables(name: String, root: PathBuf, tables: Vec<Table>) -> Self {
        Self { name, root, tables }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn create_table(&mut self, name: &str, num_columns: usize) -> Result<usize> {
        validate_name("table", name)?;
        if num_columns < 1 {
            return Err(Error::InvalidArgument(format!(
                "table '{}' needs at least one column",
                name
            )));
        }
        if num_columns > MAX_TABLE_COLUMNS {
            return Err(Error::InvalidArgument(format!(
                "table '{}' declares {} columns, limit is {}",
                name, num_columns, MAX_TABLE_COLUMNS
            )));
        }
        if self.tables.iter().any(|t| t.name() == name) {
            return Err(Error::AlreadyExists(format!(
                "table '{}.{}'",
                self.name, name
            )));
        }

        self.tables.push(Table::new(name.to_string(), num_columns));
        tracing::debug!(db = %self.name, table = name, num_columns, "created table");
        Ok(self.tables.len() - 1)
    }

    pub fn create_column(&mut self, table: usize, name: &str, sorted: bool) -> Result<ColumnId> {
        let db = self.name.clone();
        let root = self.root.clone();
        let t = self.table_mut(table)?;

        t.create_column(&db, &root, name, sorted)?;
        let id = ColumnId {
            table,
            column: t.columns().len() - 1,
        };

        tracing::debug!(db = %db, table = %t.name(), column = name, sorted, "created column");
        Ok(id)
    }

    /// Resolves `db.table`.
    pub fn lookup_table(&self, qualified: &str) -> Result<usize> {
        let parts = split_qualified(qualified, 2)?;
        self.check_db(parts[0], qualified)?;

        self.tables
            .iter()
            .position(|t| t.name() == parts[1])
            .ok_or_else(|| Error::NotFound(format!("table '{}'", qualified)))
    }

    /// Resolves `db.table.column`.
    pub fn lookup_column(&self, qualified: &str) -> Result<ColumnId> {
        let parts = split_qualified(qualified, 3)?;
        self.check_db(parts[0], qualified)?;

        let table = self
            .tables
            .iter()
            .position(|t| t.name() == parts[1])
            .ok_or_else(|| Error::NotFound(format!("table '{}.{}'", parts[0], parts[1])))?;
        let column = self.tables[table]
            .column_position(parts[2])
            .ok_or_else(|| Error::NotFound(format!("column '{}'", qualified)))?;

        Ok(ColumnId { table, column })
    }

    pub fn table(&self, idx: usize) -> Result<&Table> {
        self.tables
            .get(idx)
            .ok_or_else(|| Error::NotFound(format!("table slot {}", idx)))
    }

    pub fn table_mut(&mut self, idx: usize) -> Result<&mut Table> {
        self.tables
            .get_mut(idx)
            .ok_or_else(|| Error::NotFound(format!("table slot {}", idx)))
    }

    pub fn column(&self, id: ColumnId) -> Result<&Column> {
        self.table(id.table)?
            .columns()
            .get(id.column)
            .ok_or_else(|| Error::NotFound(format!("column slot {:?}", id)))
    }

    pub fn column_mut(&mut self, id: ColumnId) -> Result<&mut Column> {
        self.table_mut(id.table)?
            .columns_mut()
            .get_mut(id.column)
            .ok_or_else(|| Error::NotFound(format!("column slot {:?}", id)))
    }

    /// `db.table.column` for a resolved column.
    pub fn qualified_name(&self, id: ColumnId) -> Result<String> {
        let table = self.table(id.table)?;
        let column = self.column(id)?;
        Ok(format!(
            "{}{sep}{}{sep}{}",
            self.name,
            table.name(),
            column.name(),
            sep = NAME_SEPARATOR
        ))
    }

    /// Flushes every dirty column and rewrites the metadata file.
    ///
    /// A column that fails to flush is logged and recorded in the report; only a
    /// failure to write the metadata file fails the call.
    pub fn persist_all(&mut self) -> Result<PersistReport> {
        let mut report = PersistReport::default();

        for table in &mut self.tables {
            let table_name = table.name().to_string();
            for column in table.columns_mut() {
                match column.persist() {
                    Ok(true) => report.columns_flushed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            table = %table_name,
                            column = %column.name(),
                            error = %e,
                            "failed to persist column"
                        );
                        report
                            .failures
                            .push(format!("{}.{}: {}", table_name, column.name(), e));
                    }
                }
            }
        }

        persistence::write_metadata(self)?;

        tracing::info!(
            db = %self.name,
            flushed = report.columns_flushed,
            failures = report.failures.len(),
            "persisted database"
        );
        Ok(report)
    }

    fn check_db(&self, db: &str, qualified: &str) -> Result<()> {
        if db != self.name {
            return Err(Error::NotFound(format!(
                "database '{}' in '{}'",
                db, qualified
            )));
        }
        Ok(())
    }
}

fn split_qualified(qualified: &str, expected: usize) -> Result<Vec<&str>> {
    let parts: Vec<&str> = qualified.split(NAME_SEPARATOR).collect();
    if parts.len() != expected || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not a name of the form {}",
            qualified,
            if expected == 2 { "db.table" } else { "db.table.column" }
        )));
    }
    Ok(parts)
}
