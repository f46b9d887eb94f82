use std::fmt::Write;

use crate::error::{Error, Result};
use crate::query::result::{GeneralizedColumn, ResultColumn};
use crate::schema::Catalog;

enum Printable<'a> {
    Stored(&'a [i32]),
    Int(&'a [i64]),
    Float(&'a [f64]),
}

impl Printable<'_> {
    fn len(&self) -> usize {
        match self {
            Printable::Stored(v) => v.len(),
            Printable::Int(v) => v.len(),
            Printable::Float(v) => v.len(),
        }
    }

    fn write_field(&self, row: usize, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            Printable::Stored(v) => write!(out, "{}", v[row]),
            Printable::Int(v) => write!(out, "{}", v[row]),
            Printable::Float(v) => write!(out, "{:.2}", v[row]),
        };
    }
}

/// Renders equal-length inputs row-major: one line per row, fields joined by `,`.
pub fn render(catalog: &Catalog, inputs: &[&GeneralizedColumn]) -> Result<String> {
    let columns = inputs
        .iter()
        .map(|input| match input {
            GeneralizedColumn::Raw(id) => Ok(Printable::Stored(catalog.column(*id)?.values()?)),
            GeneralizedColumn::Result(ResultColumn::Int(v)) => Ok(Printable::Int(v)),
            GeneralizedColumn::Result(ResultColumn::Float(v)) => Ok(Printable::Float(v)),
            GeneralizedColumn::Result(other) => Err(Error::TypeMismatch(format!(
                "cannot print a {}",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    let Some(rows) = columns.first().map(Printable::len) else {
        return Ok(String::new());
    };
    if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
        return Err(Error::InvalidArgument(format!(
            "print inputs have {} and {} rows",
            rows,
            bad.len()
        )));
    }

    let mut out = String::new();
    for row in 0..rows {
        if row > 0 {
            out.push('\n');
        }
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            column.write_field(row, &mut out);
        }
    }
    Ok(out)
}
