//! # CSV Bulk Load
//!
//! Reads a CSV file whose header names fully qualified columns of one table and
//! whose rows hold one integer per field:
//!
//! ```text
//! db1.tbl1.col1,db1.tbl1.col2
//! 10,-3
//! 11,42
//! ```
//!
//! The whole file is parsed and validated into column-major vectors before
//! anything is written; the executor then appends every column in one
//! all-or-nothing `Table::append_columns` call.

use std::fs;
use std::path::Path;

use eyre::WrapErr;

use crate::error::{Error, Result};

/// A parsed CSV file, column-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvBatch {
    pub columns: Vec<String>,
    pub values: Vec<Vec<i32>>,
}

impl CsvBatch {
    pub fn rows(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }
}

pub fn read_csv(path: &Path) -> Result<CsvBatch> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read '{}'", path.display()))?;
    parse_csv(&text)
}

pub fn parse_csv(text: &str) -> Result<CsvBatch> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(n, l)| (n + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(Error::InvalidArgument("CSV file has no header".into()));
    };

    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
    if columns.iter().any(String::is_empty) {
        return Err(Error::InvalidArgument(format!(
            "CSV header '{}' has an empty column name",
            header
        )));
    }
    for (i, name) in columns.iter().enumerate() {
        if columns[..i].contains(name) {
            return Err(Error::InvalidArgument(format!(
                "CSV header lists column '{}' twice",
                name
            )));
        }
    }

    let mut values: Vec<Vec<i32>> = vec![Vec::new(); columns.len()];
    for (line_no, line) in lines {
        let mut fields = 0;
        for (col, field) in line.split(',').enumerate() {
            let field = field.trim();
            let value = field.parse::<i32>().map_err(|_| {
                Error::InvalidArgument(format!(
                    "line {}: '{}' is not a 32-bit integer",
                    line_no, field
                ))
            })?;
            let Some(target) = values.get_mut(col) else {
                return Err(Error::InvalidArgument(format!(
                    "line {}: more fields than the {} header columns",
                    line_no,
                    columns.len()
                )));
            };
            target.push(value);
            fields += 1;
        }
        if fields != columns.len() {
            return Err(Error::InvalidArgument(format!(
                "line {}: {} fields for {} columns",
                line_no,
                fields,
                columns.len()
            )));
        }
    }

    Ok(CsvBatch { columns, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn parses_column_major() {
        let batch = parse_csv("db1.t.a, db1.t.b\n1,2\n\n 3 , -4 \n").unwrap();

        assert_eq!(batch.columns, ["db1.t.a", "db1.t.b"]);
        assert_eq!(batch.values, [vec![1, 3], vec![2, -4]]);
        assert_eq!(batch.rows(), 2);
    }

    #[test]
    fn header_only_is_empty_batch() {
        let batch = parse_csv("db1.t.a\n").unwrap();

        assert_eq!(batch.rows(), 0);
    }

    #[test]
    fn malformed_input_is_invalid_argument() {
        for text in [
            "",
            "db1.t.a,\n1,2",
            "db1.t.a,db1.t.a\n1,2",
            "db1.t.a,db1.t.b\n1",
            "db1.t.a,db1.t.b\n1,2,3",
            "db1.t.a\nx",
            "db1.t.a\n4294967296",
        ] {
            assert_eq!(
                parse_csv(text).unwrap_err().kind(),
                ErrorKind::InvalidArgument,
                "{:?}",
                text
            );
        }
    }

    #[test]
    fn missing_file_is_storage_error() {
        let dir = tempdir().unwrap();

        let err = read_csv(&dir.path().join("none.csv")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
