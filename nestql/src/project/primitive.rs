//!
//! Column projection.
//!

use serde_json::Value as Json;

use super::Field;
use crate::column::Column;
use crate::engine::{Planner, QueryField};
use crate::schema::{Instance, Relation};
use crate::ty::Type;
use crate::{NestError, NestResult};

impl<T, Ty> Field<T> for Column<T, Ty>
where
    T: Relation + Instance,
    Ty: Type,
{
    type Output = Ty;

    fn plan(&self, planner: &mut Planner) -> NestResult<QueryField> {
        planner.resolve_scalar(&self.column_ref())
    }

    fn decode(&self, json: &Json) -> NestResult<Ty> {
        Ty::from_json(json).map_err(|detail| NestError::Decode {
            relation: T::instance().name(),
            detail: format!("column `{}`: {}", self.name(), detail),
        })
    }
}
