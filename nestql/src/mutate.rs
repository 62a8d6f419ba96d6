//!
//! Single-relation mutations: insert, update and delete.
//!
//! Mutations are plain parameterized statements. A predicate that matches
//! nothing is not an error: the affected row count is simply zero.
//!

use serde_json::Value as Json;

use crate::builder::QueryBuilder;
use crate::column::Column;
use crate::database::{Database, Dialect, Executor};
use crate::engine::{build_condition, Planner, Statement};
use crate::expr::Predicate;
use crate::filter::Filter;
use crate::schema::{Instance, Relation};
use crate::ty::{Bind, Type, Value};
use crate::{NestError, NestResult};

/// Check that `column` is a plain column of `T` and return its name.
fn local_column<T, Ty>(column: &Column<T, Ty>) -> NestResult<&'static str>
where
    T: Relation + Instance,
    Ty: Type,
{
    let column_ref = column.column_ref();
    if !column_ref.path.is_empty() {
        return Err(NestError::SchemaMismatch {
            relation: T::instance().name(),
            column: column_ref.name,
            detail: "mutations cannot write through implicit joins",
        });
    }
    if T::instance().column(column_ref.name).is_none() {
        return Err(NestError::SchemaMismatch {
            relation: T::instance().name(),
            column: column_ref.name,
            detail: "no such column",
        });
    }
    Ok(column_ref.name)
}

fn assign(slots: &mut Vec<(&'static str, Value)>, name: &'static str, value: Value) {
    match slots.iter_mut().find(|(existing, _)| *existing == name) {
        Some(slot) => slot.1 = value,
        None => slots.push((name, value)),
    }
}

/// Render ` WHERE ...` for a single-relation mutation aliased `t0`.
fn build_where<T>(predicate: Option<&Predicate>, builder: &mut QueryBuilder) -> NestResult<()>
where
    T: Relation + Instance,
{
    let predicate = match predicate {
        Some(predicate) => predicate,
        None => return Ok(()),
    };

    if let Some(joined) = predicate.columns().into_iter().find(|c| !c.path.is_empty()) {
        return Err(NestError::SchemaMismatch {
            relation: T::instance().name(),
            column: joined.name,
            detail: "mutation predicates cannot use implicit joins",
        });
    }

    let mut planner = Planner::new();
    planner.enter(T::instance());
    let condition = planner.resolve_predicate(predicate, &mut 0)?;

    builder.push(" WHERE ");
    build_condition(&condition, builder, true);
    Ok(())
}

fn build_returning(dialect: Dialect, column: &'static str, builder: &mut QueryBuilder) {
    match dialect {
        Dialect::Sqlite => {
            builder.push(" RETURNING json_array(");
            builder.push_ident(column);
            builder.push(")");
        }
        Dialect::Postgres => {
            builder.push(" RETURNING json_build_array(");
            builder.push_ident(column);
            builder.push(")::text");
        }
    }
}

/// Extract the single value out of a `[value]` row payload.
pub(crate) fn returned_value(relation: &'static str, rows: Vec<String>) -> NestResult<Json> {
    let decode_error = |detail: String| NestError::Decode { relation, detail };

    let row = match rows.len() {
        0 => return Err(NestError::NotFound { relation }),
        1 => &rows[0],
        _ => return Err(NestError::TooManyRows { relation }),
    };

    match serde_json::from_str::<Json>(row).map_err(|err| decode_error(err.to_string()))? {
        Json::Array(mut values) if values.len() == 1 => Ok(values.remove(0)),
        other => Err(decode_error(format!(
            "expected one returned value, found `{}`",
            other
        ))),
    }
}

///
/// INSERT of one row into `T`.
///
pub struct Insert<T> {
    pub(crate) values: Vec<(&'static str, Value)>,
    error: Option<NestError>,
    table: std::marker::PhantomData<fn() -> T>,
}

pub fn insert_into<T>() -> Insert<T>
where
    T: Relation + Instance,
{
    Insert {
        values: vec![],
        error: None,
        table: std::marker::PhantomData,
    }
}

impl<T> Insert<T>
where
    T: Relation + Instance,
{
    /// Set the value of one column. Setting a column twice keeps the last value.
    pub fn value<Ty, V>(mut self, column: Column<T, Ty>, value: V) -> Self
    where
        Ty: Type,
        V: Bind<Ty>,
    {
        match local_column(&column) {
            Ok(name) => assign(&mut self.values, name, value.bind_value()),
            Err(error) => {
                self.error.get_or_insert(error);
            }
        }
        self
    }

    /// Also return the value of `column` for the inserted row, typically a generated key.
    pub fn returning<Ty: Type>(self, column: Column<T, Ty>) -> InsertReturning<T, Ty> {
        InsertReturning {
            insert: self,
            column,
        }
    }

    fn build(&self, builder: &mut QueryBuilder) -> NestResult<()> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        builder.push("INSERT INTO ");
        builder.push_ident(T::instance().name());

        if self.values.is_empty() {
            builder.push(" DEFAULT VALUES");
            return Ok(());
        }

        builder.push(" (");
        for (idx, (name, _)) in self.values.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            builder.push_ident(name);
        }
        builder.push(") VALUES (");
        for (idx, (_, value)) in self.values.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            builder.push_param(value.clone());
        }
        builder.push(")");
        Ok(())
    }

    pub fn compile<DB: Database>(&self) -> NestResult<Statement> {
        let mut builder = QueryBuilder::new(DB::DIALECT);
        self.build(&mut builder)?;
        Ok(Statement::new(builder, T::instance().name()))
    }

    pub(crate) fn compile_returning<DB: Database>(
        &self,
        column: &'static str,
    ) -> NestResult<Statement> {
        let mut builder = QueryBuilder::new(DB::DIALECT);
        self.build(&mut builder)?;
        build_returning(DB::DIALECT, column, &mut builder);
        Ok(Statement::new(builder, T::instance().name()))
    }

    /// Insert the row, returning the number of affected rows.
    pub async fn execute<E: Executor>(&self, executor: &mut E) -> NestResult<u64> {
        let statement = self.compile::<E::DB>()?;
        executor.execute(&statement).await
    }
}

pub struct InsertReturning<T, Ty> {
    insert: Insert<T>,
    column: Column<T, Ty>,
}

impl<T, Ty> InsertReturning<T, Ty>
where
    T: Relation + Instance,
    Ty: Type,
{
    pub fn compile<DB: Database>(&self) -> NestResult<Statement> {
        self.insert.compile_returning::<DB>(local_column(&self.column)?)
    }

    /// Insert the row, returning the value of the requested column.
    pub async fn fetch<E: Executor>(&self, executor: &mut E) -> NestResult<Ty> {
        let statement = self.compile::<E::DB>()?;
        let rows = executor.fetch_rows(&statement).await?;
        let value = returned_value(statement.relation(), rows)?;

        Ty::from_json(&value).map_err(|detail| NestError::Decode {
            relation: statement.relation(),
            detail: format!("column `{}`: {}", self.column.name(), detail),
        })
    }
}

///
/// UPDATE of the rows of `T` matching a predicate.
///
pub struct Update<T> {
    pub(crate) assignments: Vec<(&'static str, Value)>,
    pub(crate) predicate: Option<Predicate>,
    error: Option<NestError>,
    table: std::marker::PhantomData<fn() -> T>,
}

pub fn update<T>() -> Update<T>
where
    T: Relation + Instance,
{
    Update {
        assignments: vec![],
        predicate: None,
        error: None,
        table: std::marker::PhantomData,
    }
}

impl<T> Update<T>
where
    T: Relation + Instance,
{
    /// Assign one column. Assigning a column twice keeps the last value.
    pub fn set<Ty, V>(mut self, column: Column<T, Ty>, value: V) -> Self
    where
        Ty: Type,
        V: Bind<Ty>,
    {
        match local_column(&column) {
            Ok(name) => assign(&mut self.assignments, name, value.bind_value()),
            Err(error) => {
                self.error.get_or_insert(error);
            }
        }
        self
    }

    pub fn compile<DB: Database>(&self) -> NestResult<Statement> {
        let relation = T::instance().name();
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.assignments.is_empty() {
            return Err(NestError::SchemaMismatch {
                relation,
                column: "*",
                detail: "update has no assignments",
            });
        }

        let mut builder = QueryBuilder::new(DB::DIALECT);
        builder.push("UPDATE ");
        builder.push_ident(relation);
        builder.push(" AS ");
        builder.push_alias(0);
        builder.push(" SET ");
        for (idx, (name, value)) in self.assignments.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            builder.push_ident(name);
            builder.push(" = ");
            builder.push_param(value.clone());
        }
        build_where::<T>(self.predicate.as_ref(), &mut builder)?;

        Ok(Statement::new(builder, relation))
    }

    /// Update matching rows, returning how many there were.
    pub async fn execute<E: Executor>(&self, executor: &mut E) -> NestResult<u64> {
        let statement = self.compile::<E::DB>()?;
        executor.execute(&statement).await
    }
}

impl<T> Filter for Update<T> {
    fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }
}

///
/// DELETE of the rows of `T` matching a predicate.
///
pub struct Delete<T> {
    pub(crate) predicate: Option<Predicate>,
    table: std::marker::PhantomData<fn() -> T>,
}

pub fn delete_from<T>() -> Delete<T>
where
    T: Relation + Instance,
{
    Delete {
        predicate: None,
        table: std::marker::PhantomData,
    }
}

impl<T> Delete<T>
where
    T: Relation + Instance,
{
    pub fn compile<DB: Database>(&self) -> NestResult<Statement> {
        let relation = T::instance().name();

        let mut builder = QueryBuilder::new(DB::DIALECT);
        builder.push("DELETE FROM ");
        builder.push_ident(relation);
        builder.push(" AS ");
        builder.push_alias(0);
        build_where::<T>(self.predicate.as_ref(), &mut builder)?;

        Ok(Statement::new(builder, relation))
    }

    /// Delete matching rows, returning how many there were.
    pub async fn execute<E: Executor>(&self, executor: &mut E) -> NestResult<u64> {
        let statement = self.compile::<E::DB>()?;
        executor.execute(&statement).await
    }
}

impl<T> Filter for Delete<T> {
    fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }
}
