//!
//! Nested projection.
//!

use serde_json::Value as Json;

use super::{Field, Mapper, Node, Selection};
use crate::engine::{Planner, QueryField};
use crate::schema::{Instance, Relation};
use crate::{NestError, NestResult};

///
/// A nested collection selected as one field of an enclosing level `P`.
///
/// Every enclosing row receives the ordered sequence of child records
/// correlated to it, an empty `Vec` when there are none.
///
pub struct Multiset<P, T, S, M> {
    node: Node<T, S, M>,
    parent: std::marker::PhantomData<fn() -> P>,
}

/// Nest `node` as a collection field of the enclosing level.
pub fn multiset<P, T, S, M>(node: Node<T, S, M>) -> Multiset<P, T, S, M>
where
    P: Relation + Instance,
    T: Relation + Instance,
    S: Selection<T>,
    M: Mapper<S::Values>,
{
    Multiset {
        node,
        parent: std::marker::PhantomData,
    }
}

impl<P, T, S, M> Field<P> for Multiset<P, T, S, M>
where
    P: Relation + Instance,
    T: Relation + Instance,
    S: Selection<T>,
    M: Mapper<S::Values>,
{
    type Output = Vec<M::Output>;

    fn plan(&self, planner: &mut Planner) -> NestResult<QueryField> {
        Ok(QueryField::Foreign(Box::new(self.node.plan(planner)?)))
    }

    fn decode(&self, json: &Json) -> NestResult<Self::Output> {
        let relation = T::instance().name();

        match json {
            Json::Array(rows) => rows.iter().map(|row| self.node.decode_row(row)).collect(),
            // the aggregate may arrive as JSON text when the store drops its type
            Json::String(text) => {
                let parsed: Json = serde_json::from_str(text).map_err(|err| NestError::Decode {
                    relation,
                    detail: err.to_string(),
                })?;
                match parsed {
                    Json::Array(_) => self.decode(&parsed),
                    other => Err(NestError::Decode {
                        relation,
                        detail: format!("expected a nested array, found `{}`", other),
                    }),
                }
            }
            other => Err(NestError::Decode {
                relation,
                detail: format!("expected a nested array, found `{}`", other),
            }),
        }
    }
}
