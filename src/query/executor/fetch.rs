use crate::error::{Error, Result};
use crate::schema::{Catalog, ColumnId};

/// Gathers `column[p]` for every position, in list order.
pub fn fetch(catalog: &Catalog, column: ColumnId, positions: &[usize]) -> Result<Vec<i64>> {
    let values = catalog.column(column)?.values()?;

    positions
        .iter()
        .map(|&p| {
            values
                .get(p)
                .map(|&v| v as i64)
                .ok_or(Error::IndexOutOfRange {
                    position: p,
                    len: values.len(),
                })
        })
        .collect()
}
