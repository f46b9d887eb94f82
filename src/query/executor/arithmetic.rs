use crate::error::{Error, Result};
use crate::query::operator::ArithmeticKind;
use crate::query::result::{GeneralizedColumn, IntValues};
use crate::schema::Catalog;

/// Element-wise `left op right` over equal-length integer inputs.
pub fn arithmetic(
    catalog: &Catalog,
    kind: ArithmeticKind,
    left: &GeneralizedColumn,
    right: &GeneralizedColumn,
) -> Result<Vec<i64>> {
    let left = IntValues::of(left, catalog)?;
    let right = IntValues::of(right, catalog)?;

    if left.len() != right.len() {
        return Err(Error::InvalidArgument(format!(
            "operands have {} and {} elements",
            left.len(),
            right.len()
        )));
    }

    left.iter()
        .zip(right.iter())
        .map(|(a, b)| {
            match kind {
                ArithmeticKind::Add => a.checked_add(b),
                ArithmeticKind::Sub => a.checked_sub(b),
            }
            .ok_or_else(|| Error::InvalidArgument(format!("{:?} of {} and {} overflows", kind, a, b)))
        })
        .collect()
}
