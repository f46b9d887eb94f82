//! # Operator Results
//!
//! Operators read and produce *generalized columns*: either a stored column of
//! the catalog, addressed by [`ColumnId`], or a materialized [`ResultColumn`].
//! A result is a position list, a long-integer vector, or a float vector; a
//! scalar (an aggregate) is a one-element vector.

use crate::error::{Error, Result};
use crate::schema::{Catalog, ColumnId};

#[derive(Debug, Clone, PartialEq)]
pub enum ResultColumn {
    /// Original row positions, in the order the producing operator emitted them.
    Positions(Vec<usize>),
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl ResultColumn {
    pub fn len(&self) -> usize {
        match self {
            ResultColumn::Positions(v) => v.len(),
            ResultColumn::Int(v) => v.len(),
            ResultColumn::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ResultColumn::Positions(_) => "position list",
            ResultColumn::Int(_) => "integer result",
            ResultColumn::Float(_) => "float result",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneralizedColumn {
    Raw(ColumnId),
    Result(ResultColumn),
}

impl GeneralizedColumn {
    pub fn type_name(&self) -> &'static str {
        match self {
            GeneralizedColumn::Raw(_) => "column",
            GeneralizedColumn::Result(r) => r.type_name(),
        }
    }

    pub fn len(&self, catalog: &Catalog) -> Result<usize> {
        match self {
            GeneralizedColumn::Raw(id) => Ok(catalog.column(*id)?.num_elements()),
            GeneralizedColumn::Result(r) => Ok(r.len()),
        }
    }

    /// Position list view; anything else is a type mismatch.
    pub fn positions(&self) -> Result<&[usize]> {
        match self {
            GeneralizedColumn::Result(ResultColumn::Positions(p)) => Ok(p),
            other => Err(Error::TypeMismatch(format!(
                "expected a position list, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Integer values of an operator input, borrowed from a column or a result.
#[derive(Debug)]
pub enum IntValues<'a> {
    Stored(&'a [i32]),
    Long(&'a [i64]),
}

impl<'a> IntValues<'a> {
    /// Borrows the integer values behind `input`. Positions and floats are rejected.
    pub fn of(input: &'a GeneralizedColumn, catalog: &'a Catalog) -> Result<Self> {
        match input {
            GeneralizedColumn::Raw(id) => Ok(IntValues::Stored(catalog.column(*id)?.values()?)),
            GeneralizedColumn::Result(ResultColumn::Int(v)) => Ok(IntValues::Long(v)),
            other => Err(Error::TypeMismatch(format!(
                "expected integer values, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IntValues::Stored(v) => v.len(),
            IntValues::Long(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> i64 {
        match self {
            IntValues::Stored(v) => v[i] as i64,
            IntValues::Long(v) => v[i],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}
