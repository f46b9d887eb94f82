//! Select: scan-and-filter, or an index range when the column has a current
//! index and the predicate is a single interval.

use crate::error::{Error, Result};
use crate::query::operator::Predicate;
use crate::query::result::{GeneralizedColumn, IntValues};
use crate::schema::Catalog;

pub fn select(
    catalog: &Catalog,
    input: &GeneralizedColumn,
    reference: Option<&[usize]>,
    predicate: &Predicate,
) -> Result<Vec<usize>> {
    if let (GeneralizedColumn::Raw(id), None) = (input, reference) {
        let column = catalog.column(*id)?;
        if let (Some(index), Some((lo, hi))) = (column.index(), predicate.as_interval()) {
            let rows = index.range(lo, hi);
            tracing::debug!(
                column = %column.name(),
                kind = index.kind().as_str(),
                matched = rows.len(),
                "index select"
            );
            return Ok(rows);
        }
        if let Some(file) = column.file() {
            file.advise_sequential(column.num_elements());
        }
    }

    let values = IntValues::of(input, catalog)?;

    let rows: Vec<usize> = match reference {
        None => values
            .iter()
            .enumerate()
            .filter(|&(_, v)| predicate.matches(v))
            .map(|(i, _)| i)
            .collect(),
        Some(positions) => {
            if positions.len() != values.len() {
                return Err(Error::InvalidArgument(format!(
                    "reference list has {} positions for {} values",
                    positions.len(),
                    values.len()
                )));
            }
            values
                .iter()
                .zip(positions)
                .filter(|&(v, _)| predicate.matches(v))
                .map(|(_, &p)| p)
                .collect()
        }
    };

    tracing::debug!(scanned = values.len(), matched = rows.len(), "scan select");
    Ok(rows)
}
