//!
//! Things related to data projection, the shape of returned data.
//!
//! A projection is a tree of [`Node`]s. Each node selects a tuple of fields
//! from one relation, where a field is either a column or a nested
//! [`Multiset`] of child nodes, and maps every selected tuple into a value
//! through its [`Mapper`].
//!

use serde_json::Value as Json;

use crate::builder::QueryBuilder;
use crate::column::{Foreign, OneToMany, OrderBy};
use crate::database::{Database, Executor};
use crate::engine::{Link, Planner, QueryField, Statement};
use crate::expr::Predicate;
use crate::filter::{Filter, IntoRowRange, Range, RowRange};
use crate::quantify::{AsOption, AsSelf, AsVec, Cardinality, Quantify};
use crate::schema::{Instance, Relation};
use crate::{NestError, NestResult};

pub mod foreign;
pub mod primitive;

pub use foreign::{multiset, Multiset};

/// # Field
///
/// Something selectable from relation `T`, producing one value per row.
///
pub trait Field<T> {
    /// Data type produced by the field
    type Output;

    fn plan(&self, planner: &mut Planner) -> NestResult<QueryField>;

    fn decode(&self, json: &Json) -> NestResult<Self::Output>;
}

/// A tuple of fields selected from relation `T`.
pub trait Selection<T> {
    type Values;

    fn plan(&self, planner: &mut Planner) -> NestResult<Vec<QueryField>>;

    fn decode(&self, row: &[Json], relation: &'static str) -> NestResult<Self::Values>;
}

macro_rules! selection_tuple {
    ($arity:literal: $($field:ident $idx:tt),+) => {
        impl<T, $($field),+> Selection<T> for ($($field,)+)
        where
            $($field: Field<T>),+
        {
            type Values = ($($field::Output,)+);

            fn plan(&self, planner: &mut Planner) -> NestResult<Vec<QueryField>> {
                Ok(vec![$(self.$idx.plan(planner)?),+])
            }

            fn decode(&self, row: &[Json], relation: &'static str) -> NestResult<Self::Values> {
                if row.len() != $arity {
                    return Err(NestError::Decode {
                        relation,
                        detail: format!("expected {} values per row, found {}", $arity, row.len()),
                    });
                }

                Ok(($(self.$idx.decode(&row[$idx])?,)+))
            }
        }
    };
}

selection_tuple!(1: F0 0);
selection_tuple!(2: F0 0, F1 1);
selection_tuple!(3: F0 0, F1 1, F2 2);
selection_tuple!(4: F0 0, F1 1, F2 2, F3 3);
selection_tuple!(5: F0 0, F1 1, F2 2, F3 3, F4 4);
selection_tuple!(6: F0 0, F1 1, F2 2, F3 3, F4 4, F5 5);
selection_tuple!(7: F0 0, F1 1, F2 2, F3 3, F4 4, F5 5, F6 6);
selection_tuple!(8: F0 0, F1 1, F2 2, F3 3, F4 4, F5 5, F6 6, F7 7);
selection_tuple!(9: F0 0, F1 1, F2 2, F3 3, F4 4, F5 5, F6 6, F7 7, F8 8);
selection_tuple!(10: F0 0, F1 1, F2 2, F3 3, F4 4, F5 5, F6 6, F7 7, F8 8, F9 9);
selection_tuple!(11: F0 0, F1 1, F2 2, F3 3, F4 4, F5 5, F6 6, F7 7, F8 8, F9 9, F10 10);
selection_tuple!(12: F0 0, F1 1, F2 2, F3 3, F4 4, F5 5, F6 6, F7 7, F8 8, F9 9, F10 10, F11 11);

/// Maps the values selected for one row into the caller's record type.
///
/// Implemented for functions taking the selected values as separate arguments,
/// so record constructors can be passed directly.
pub trait Mapper<Args> {
    type Output;

    fn map(&self, args: Args) -> Self::Output;
}

/// The mapper every node starts out with: rows are returned as tuples.
pub struct Identity;

impl<Args> Mapper<Args> for Identity {
    type Output = Args;

    fn map(&self, args: Args) -> Args {
        args
    }
}

macro_rules! fn_mapper {
    ($($arg:ident $value:ident),+) => {
        impl<F, O, $($arg),+> Mapper<($($arg,)+)> for F
        where
            F: Fn($($arg),+) -> O,
        {
            type Output = O;

            fn map(&self, ($($value,)+): ($($arg,)+)) -> O {
                self($($value),+)
            }
        }
    };
}

fn_mapper!(A0 a0);
fn_mapper!(A0 a0, A1 a1);
fn_mapper!(A0 a0, A1 a1, A2 a2);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10);
fn_mapper!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11);

/// The start of a projection from relation `T`.
pub struct Select<T> {
    table: std::marker::PhantomData<fn() -> T>,
}

pub fn select<T>() -> Select<T>
where
    T: Relation + Instance,
{
    Select {
        table: std::marker::PhantomData,
    }
}

impl<T> Select<T>
where
    T: Relation + Instance,
{
    pub fn columns<S>(self, selection: S) -> Node<T, S, Identity>
    where
        S: Selection<T>,
    {
        Node {
            selection,
            mapper: Identity,
            predicate: None,
            links: vec![],
            order: vec![],
            range: RowRange::default(),
            table: std::marker::PhantomData,
        }
    }
}

///
/// One level of a projection tree.
///
/// `T` is the relation selected from, `S` the selected fields
/// and `M` the mapping applied to every row.
///
pub struct Node<T, S, M> {
    selection: S,
    mapper: M,
    predicate: Option<Predicate>,
    links: Vec<Link>,
    order: Vec<OrderBy>,
    range: RowRange,
    table: std::marker::PhantomData<fn() -> T>,
}

impl<T, S, M> Node<T, S, M>
where
    T: Relation + Instance,
    S: Selection<T>,
    M: Mapper<S::Values>,
{
    /// Replace the row mapping, typically with a record constructor.
    pub fn map<M2>(self, mapper: M2) -> Node<T, S, M2>
    where
        M2: Mapper<S::Values>,
    {
        Node {
            selection: self.selection,
            mapper,
            predicate: self.predicate,
            links: self.links,
            order: self.order,
            range: self.range,
            table: std::marker::PhantomData,
        }
    }

    /// Correlate this level to an enclosing level of relation `P`
    /// through one of its declared to-many foreign keys.
    pub fn via<P>(mut self, foreign: Foreign<P, T, OneToMany>) -> Self
    where
        P: Relation + Instance,
    {
        self.links.push(foreign.link());
        self
    }

    /// Add an ordering key. Keys apply in the order they were added.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.range.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.range.offset = Some(offset);
        self
    }

    pub(crate) fn plan(&self, planner: &mut Planner) -> NestResult<crate::engine::Select> {
        self.plan_with_range(planner, self.range)
    }

    fn plan_with_range(
        &self,
        planner: &mut Planner,
        range: RowRange,
    ) -> NestResult<crate::engine::Select> {
        planner.enter(T::instance());

        let projection = self.selection.plan(planner)?;

        let mut parent_refs = 0;
        let mut clauses = vec![];
        for link in &self.links {
            clauses.push(planner.resolve_link(link, &mut parent_refs)?);
        }
        if let Some(predicate) = &self.predicate {
            clauses.push(planner.resolve_predicate(predicate, &mut parent_refs)?);
        }
        planner.require_correlation(parent_refs)?;

        let order = self
            .order
            .iter()
            .map(|order| planner.resolve_order(order))
            .collect::<NestResult<Vec<_>>>()?;

        let condition = match clauses.len() {
            0 | 1 => clauses.pop(),
            _ => Some(crate::engine::Condition::And(clauses)),
        };

        Ok(planner.exit(projection, condition, order, range))
    }

    /// Compile the whole tree into one statement for database `DB`.
    pub fn compile<DB: Database>(&self) -> NestResult<Statement> {
        self.compile_with_range::<DB>(self.range)
    }

    fn compile_with_range<DB: Database>(&self, range: RowRange) -> NestResult<Statement> {
        let mut planner = Planner::new();
        let select = self.plan_with_range(&mut planner, range)?;

        let mut builder = QueryBuilder::new(DB::DIALECT);
        select.build_root(&mut builder);

        let statement = Statement::new(builder, select.relation().name());
        tracing::trace!(relation = statement.relation(), sql = %statement, "nestql.compile");

        Ok(statement)
    }

    /// Decode one row payload, a JSON array holding the selected values.
    pub(crate) fn decode_row(&self, json: &Json) -> NestResult<M::Output> {
        let relation = T::instance().name();
        match json {
            Json::Array(values) => {
                let values = self.selection.decode(values, relation)?;
                Ok(self.mapper.map(values))
            }
            other => Err(NestError::Decode {
                relation,
                detail: format!("expected a row array, found `{}`", other),
            }),
        }
    }

    /// Turn the rows returned for a compiled statement into records.
    pub fn materialize(&self, rows: &[String]) -> NestResult<Vec<M::Output>> {
        let relation = T::instance().name();
        rows.iter()
            .map(|row| {
                let json: Json = serde_json::from_str(row).map_err(|err| NestError::Decode {
                    relation,
                    detail: err.to_string(),
                })?;
                self.decode_row(&json)
            })
            .collect()
    }

    /// Compile, execute and materialize in one round trip,
    /// quantifying the root rows with `Q`.
    pub async fn fetch<Q, E>(&self, executor: &mut E) -> NestResult<<Q as Quantify<M::Output>>::Output>
    where
        Q: Quantify<M::Output>,
        E: Executor,
    {
        // two rows are enough to tell "one" from "too many"
        let range = match (Q::CARDINALITY, self.range.limit) {
            (Cardinality::One, None) => RowRange {
                limit: Some(2),
                offset: self.range.offset,
            },
            _ => self.range,
        };

        let statement = self.compile_with_range::<E::DB>(range)?;
        let rows = executor.fetch_rows(&statement).await?;

        Q::quantify(self.materialize(&rows)?, statement.relation())
    }

    /// Fetch exactly one record, failing with `NotFound` when there is none.
    pub async fn fetch_one<E: Executor>(&self, executor: &mut E) -> NestResult<M::Output> {
        self.fetch::<AsSelf, E>(executor).await
    }

    pub async fn fetch_optional<E: Executor>(
        &self,
        executor: &mut E,
    ) -> NestResult<Option<M::Output>> {
        self.fetch::<AsOption, E>(executor).await
    }

    pub async fn fetch_all<E: Executor>(&self, executor: &mut E) -> NestResult<Vec<M::Output>> {
        self.fetch::<AsVec, E>(executor).await
    }
}

impl<T, S, M> Filter for Node<T, S, M> {
    fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }
}

impl<T, S, M> Range for Node<T, S, M> {
    fn range<R: IntoRowRange>(mut self, range: R) -> Self {
        self.range = range.into_row_range();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_mappers_spread_tuples() {
        fn pair(a: i32, b: String) -> String {
            format!("{}{}", a, b)
        }

        assert_eq!(Mapper::map(&pair, (1, "x".to_string())), "1x");
        assert_eq!(Mapper::map(&Identity, (1, 2)), (1, 2));
    }
}
