//! Aggregates over a stored column or an integer result.
//!
//! `sum`, `min` and `max` over a stored column read its running aggregates
//! instead of scanning. `avg` over nothing is `0.0`; `min`/`max` over nothing
//! produce an empty result.

use crate::error::{Error, Result};
use crate::query::operator::AggregateKind;
use crate::query::result::{GeneralizedColumn, IntValues, ResultColumn};
use crate::schema::Catalog;

pub fn aggregate(
    catalog: &Catalog,
    kind: AggregateKind,
    input: &GeneralizedColumn,
) -> Result<ResultColumn> {
    if let GeneralizedColumn::Raw(id) = input {
        let column = catalog.column(*id)?;
        match kind {
            AggregateKind::Sum => return Ok(ResultColumn::Int(vec![column.sum()])),
            AggregateKind::Min => return Ok(ResultColumn::Int(column.min().into_iter().collect())),
            AggregateKind::Max => return Ok(ResultColumn::Int(column.max().into_iter().collect())),
            AggregateKind::Avg => {
                let n = column.num_elements();
                let avg = if n == 0 {
                    0.0
                } else {
                    column.sum() as f64 / n as f64
                };
                return Ok(ResultColumn::Float(vec![avg]));
            }
        }
    }

    if let GeneralizedColumn::Result(ResultColumn::Float(values)) = input {
        return Ok(float_aggregate(kind, values));
    }

    let values = IntValues::of(input, catalog)?;
    match kind {
        AggregateKind::Sum => Ok(ResultColumn::Int(vec![checked_sum(&values)?])),
        AggregateKind::Min => Ok(ResultColumn::Int(values.iter().min().into_iter().collect())),
        AggregateKind::Max => Ok(ResultColumn::Int(values.iter().max().into_iter().collect())),
        AggregateKind::Avg => {
            let avg = if values.is_empty() {
                0.0
            } else {
                values.iter().map(|v| v as f64).sum::<f64>() / values.len() as f64
            };
            Ok(ResultColumn::Float(vec![avg]))
        }
    }
}

fn checked_sum(values: &IntValues<'_>) -> Result<i64> {
    values.iter().try_fold(0i64, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| Error::InvalidArgument("sum overflows i64".into()))
    })
}

fn float_aggregate(kind: AggregateKind, values: &[f64]) -> ResultColumn {
    let reduced = match kind {
        AggregateKind::Sum => Some(values.iter().sum()),
        AggregateKind::Min => values.iter().copied().reduce(f64::min),
        AggregateKind::Max => values.iter().copied().reduce(f64::max),
        AggregateKind::Avg if values.is_empty() => Some(0.0),
        AggregateKind::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
    };
    ResultColumn::Float(reduced.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    fn empty_catalog(dir: &std::path::Path) -> Catalog {
        Catalog::new("db1", dir).unwrap()
    }

    fn ints(v: &[i64]) -> GeneralizedColumn {
        GeneralizedColumn::Result(ResultColumn::Int(v.to_vec()))
    }

    #[test]
    fn avg_over_empty_is_zero() {
        let dir = tempdir().unwrap();
        let cat = empty_catalog(dir.path());

        let out = aggregate(&cat, AggregateKind::Avg, &ints(&[])).unwrap();

        assert_eq!(out, ResultColumn::Float(vec![0.0]));
    }

    #[test]
    fn integer_aggregates_over_results() {
        let dir = tempdir().unwrap();
        let cat = empty_catalog(dir.path());
        let input = ints(&[4, -2, 7]);

        let run = |kind| aggregate(&cat, kind, &input).unwrap();

        assert_eq!(run(AggregateKind::Sum), ResultColumn::Int(vec![9]));
        assert_eq!(run(AggregateKind::Min), ResultColumn::Int(vec![-2]));
        assert_eq!(run(AggregateKind::Max), ResultColumn::Int(vec![7]));
        assert_eq!(run(AggregateKind::Avg), ResultColumn::Float(vec![3.0]));
    }

    #[test]
    fn min_over_empty_is_empty() {
        let dir = tempdir().unwrap();
        let cat = empty_catalog(dir.path());

        let out = aggregate(&cat, AggregateKind::Min, &ints(&[])).unwrap();

        assert!(out.is_empty());
    }

    #[test]
    fn stored_column_uses_running_aggregates() {
        let dir = tempdir().unwrap();
        let mut cat = empty_catalog(dir.path());
        let t = cat.create_table("t", 1).unwrap();
        let id = cat.create_column(t, "c", false).unwrap();
        cat.column_mut(id)
            .unwrap()
            .extend_and_write(0, &[1, 2, 3, 6])
            .unwrap();
        let raw = GeneralizedColumn::Raw(id);

        assert_eq!(
            aggregate(&cat, AggregateKind::Sum, &raw).unwrap(),
            ResultColumn::Int(vec![12])
        );
        assert_eq!(
            aggregate(&cat, AggregateKind::Avg, &raw).unwrap(),
            ResultColumn::Float(vec![3.0])
        );
        assert_eq!(
            aggregate(&cat, AggregateKind::Max, &raw).unwrap(),
            ResultColumn::Int(vec![6])
        );
    }

    #[test]
    fn positions_are_type_mismatch() {
        let dir = tempdir().unwrap();
        let cat = empty_catalog(dir.path());
        let input = GeneralizedColumn::Result(ResultColumn::Positions(vec![0]));

        let err = aggregate(&cat, AggregateKind::Sum, &input).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn float_inputs_reduce_to_floats() {
        let dir = tempdir().unwrap();
        let cat = empty_catalog(dir.path());
        let input = GeneralizedColumn::Result(ResultColumn::Float(vec![1.5, 0.5]));

        assert_eq!(
            aggregate(&cat, AggregateKind::Max, &input).unwrap(),
            ResultColumn::Float(vec![1.5])
        );
        assert_eq!(
            aggregate(&cat, AggregateKind::Avg, &input).unwrap(),
            ResultColumn::Float(vec![1.0])
        );
    }
}
