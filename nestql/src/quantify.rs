//!
//! Quantification of root results.
//!
//! In this context it means a type-mapping of the row type into
//! either itself, an `Option` of itself or a collection of itself,
//! and thereby selecting the expected cardinality of a query.
//!

use crate::{NestError, NestResult};

/// Expected number of root rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    /// Zero or one row, typically a point query by primary key.
    One,
    /// Zero or many rows, a listing query.
    Many,
}

/// Quantify some type.
pub trait Quantify<U> {
    type Output;

    const CARDINALITY: Cardinality;

    fn quantify(rows: Vec<U>, relation: &'static str) -> NestResult<Self::Output>;
}

/// Quantify a type as itself: exactly one row must be returned.
pub struct AsSelf;

impl<U> Quantify<U> for AsSelf {
    type Output = U;

    const CARDINALITY: Cardinality = Cardinality::One;

    fn quantify(rows: Vec<U>, relation: &'static str) -> NestResult<U> {
        AsOption::quantify(rows, relation)?.ok_or(NestError::NotFound { relation })
    }
}

/// Quantify a type using `Option<_>`.
pub struct AsOption;

impl<U> Quantify<U> for AsOption {
    type Output = Option<U>;

    const CARDINALITY: Cardinality = Cardinality::One;

    fn quantify(rows: Vec<U>, relation: &'static str) -> NestResult<Option<U>> {
        if rows.len() > 1 {
            return Err(NestError::TooManyRows { relation });
        }
        Ok(rows.into_iter().next())
    }
}

/// Quantify a type using a `Vec<_>`.
pub struct AsVec;

impl<U> Quantify<U> for AsVec {
    type Output = Vec<U>;

    const CARDINALITY: Cardinality = Cardinality::Many;

    fn quantify(rows: Vec<U>, _relation: &'static str) -> NestResult<Vec<U>> {
        Ok(rows)
    }
}
