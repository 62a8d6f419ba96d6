//!
//! Typed references to columns, possibly reached through implicit joins.
//!

use crate::engine::Link;
use crate::schema::{Instance, Relation};
use crate::ty::Type;

/// Untyped column reference as seen by the query compiler.
///
/// `anchor` is the relation the reference starts from, `path` the names of
/// the to-one foreign keys followed from there, and `name` the column of the
/// relation the path ends in.
#[derive(Clone)]
pub struct ColumnRef {
    pub anchor: &'static dyn Relation,
    pub path: Vec<&'static str>,
    pub name: &'static str,
}

impl std::fmt::Debug for ColumnRef {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.anchor.name())?;
        for step in &self.path {
            write!(fmt, ".{}()", step)?;
        }
        write!(fmt, ".{}", self.name)
    }
}

/// A column of relation `T` holding values of type `Ty`.
///
/// Columns are normally produced by accessors generated with `#[nestql::table]`.
pub struct Column<T, Ty> {
    path: Vec<&'static str>,
    name: &'static str,
    table: std::marker::PhantomData<fn() -> T>,
    ty: std::marker::PhantomData<fn() -> Ty>,
}

impl<T, Ty> Column<T, Ty>
where
    T: Relation + Instance,
    Ty: Type,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            path: vec![],
            name,
            table: std::marker::PhantomData,
            ty: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn column_ref(&self) -> ColumnRef {
        ColumnRef {
            anchor: T::instance(),
            path: self.path.clone(),
            name: self.name,
        }
    }

    pub fn asc(&self) -> OrderBy {
        OrderBy {
            column: self.column_ref(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(&self) -> OrderBy {
        OrderBy {
            column: self.column_ref(),
            direction: Direction::Desc,
        }
    }
}

impl<T, Ty> Clone for Column<T, Ty> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            name: self.name,
            table: std::marker::PhantomData,
            ty: std::marker::PhantomData,
        }
    }
}

/// Marker: following the link yields at most one row.
pub struct OneToOne;

/// Marker: following the link yields potentially many rows.
pub struct OneToMany;

///
/// A foreign key path starting in `T1` and ending in `T2`.
///
/// To-one paths can be extended with `join` and used to reach
/// columns of `T2` as if they were columns of `T1` (implicit join).
/// To-many links correlate a nested level, see `Node::via`.
///
pub struct Foreign<T1, T2, Q> {
    path: Vec<&'static str>,
    source_table: std::marker::PhantomData<fn() -> T1>,
    foreign_table: std::marker::PhantomData<fn() -> T2>,
    quantity: std::marker::PhantomData<Q>,
}

impl<T1, T2, Q> Foreign<T1, T2, Q>
where
    T1: Relation + Instance,
    T2: Relation + Instance,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            path: vec![name],
            source_table: std::marker::PhantomData,
            foreign_table: std::marker::PhantomData,
            quantity: std::marker::PhantomData,
        }
    }
}

impl<T1, T2> Foreign<T1, T2, OneToMany>
where
    T1: Relation + Instance,
    T2: Relation + Instance,
{
    pub(crate) fn link(&self) -> Link {
        Link {
            source: T1::instance(),
            name: self.path[0],
        }
    }
}

impl<T1, T2> Foreign<T1, T2, OneToOne>
where
    T1: Relation + Instance,
    T2: Relation + Instance,
{
    pub fn join<T3>(mut self, next: Foreign<T2, T3, OneToOne>) -> Foreign<T1, T3, OneToOne>
    where
        T3: Relation + Instance,
    {
        self.path.extend(next.path);
        Foreign {
            path: self.path,
            source_table: std::marker::PhantomData,
            foreign_table: std::marker::PhantomData,
            quantity: std::marker::PhantomData,
        }
    }

    /// Reach a column of the foreign table from `T1`.
    pub fn column<Ty: Type>(&self, column: Column<T2, Ty>) -> Column<T1, Ty> {
        let mut path = self.path.clone();
        path.extend(column.path);

        Column {
            path,
            name: column.name,
            table: std::marker::PhantomData,
            ty: std::marker::PhantomData,
        }
    }

    /// Like [`Foreign::column`], but reads NULL when `T1` has no foreign row.
    pub fn nullable_column<Ty: Type>(&self, column: Column<T2, Ty>) -> Column<T1, Option<Ty>> {
        let mut path = self.path.clone();
        path.extend(column.path);

        Column {
            path,
            name: column.name,
            table: std::marker::PhantomData,
            ty: std::marker::PhantomData,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: Direction,
}
