//!
//! Updatable records.
//!

use crate::column::{Column, ColumnRef};
use crate::database::Executor;
use crate::expr::{CompareOp, Expr, Predicate};
use crate::mutate::{delete_from, insert_into, returned_value, update};
use crate::schema::{Instance, Relation};
use crate::ty::{Bind, Type, Value};
use crate::{NestError, NestResult};

///
/// One row of relation `T`, held in memory and written back with [`Record::store`].
///
/// A record whose primary key is unset is inserted on `store`, and the key
/// generated by the database is captured. Otherwise `store` updates the
/// columns changed since the last store.
///
pub struct Record<T> {
    values: Vec<(&'static str, Value)>,
    changed: Vec<&'static str>,
    table: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for Record<T> {
    fn default() -> Self {
        Self {
            values: vec![],
            changed: vec![],
            table: std::marker::PhantomData,
        }
    }
}

impl<T> Record<T>
where
    T: Relation + Instance,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn local_name<Ty: Type>(column: &Column<T, Ty>) -> NestResult<&'static str> {
        let column_ref = column.column_ref();
        if !column_ref.path.is_empty() || T::instance().column(column_ref.name).is_none() {
            return Err(NestError::SchemaMismatch {
                relation: T::instance().name(),
                column: column_ref.name,
                detail: "not a column of the record's relation",
            });
        }
        Ok(column_ref.name)
    }

    fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
    }

    fn put(&mut self, name: &'static str, value: Value) {
        match self.values.iter_mut().find(|(column, _)| *column == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn set<Ty, V>(&mut self, column: Column<T, Ty>, value: V) -> NestResult<&mut Self>
    where
        Ty: Type,
        V: Bind<Ty>,
    {
        let name = Self::local_name(&column)?;
        self.put(name, value.bind_value());
        if !self.changed.contains(&name) {
            self.changed.push(name);
        }
        Ok(self)
    }

    /// Read a column. Unset columns read as NULL.
    pub fn get<Ty: Type>(&self, column: &Column<T, Ty>) -> NestResult<Ty> {
        let name = Self::local_name(column)?;
        let json = self.value(name).unwrap_or(&Value::Null).to_json();

        Ty::from_json(&json).map_err(|detail| NestError::Decode {
            relation: T::instance().name(),
            detail: format!("column `{}`: {}", name, detail),
        })
    }

    /// Whether some column was set since the record was last stored.
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    fn primary_key() -> NestResult<&'static str> {
        match T::instance().primary_key() {
            [key] => Ok(*key),
            _ => Err(NestError::SchemaMismatch {
                relation: T::instance().name(),
                column: "*",
                detail: "records need a single-column primary key",
            }),
        }
    }

    fn key_value(&self, key: &str) -> Option<Value> {
        self.value(key).filter(|value| !value.is_null()).cloned()
    }

    fn key_predicate(key: &'static str, value: Value) -> Predicate {
        Predicate::Compare(
            CompareOp::Eq,
            Expr::Column(ColumnRef {
                anchor: T::instance(),
                path: vec![],
                name: key,
            }),
            Expr::Value(value),
        )
    }

    /// Insert or update the record, returning the number of affected rows.
    pub async fn store<E: Executor>(&mut self, executor: &mut E) -> NestResult<u64> {
        let key = Self::primary_key()?;

        let affected = match self.key_value(key) {
            None => {
                let mut insert = insert_into::<T>();
                insert.values = self
                    .values
                    .iter()
                    .filter(|(column, _)| *column != key)
                    .cloned()
                    .collect();

                let statement = insert.compile_returning::<E::DB>(key)?;
                let rows = executor.fetch_rows(&statement).await?;
                let generated = returned_value(statement.relation(), rows)?;

                self.put(key, Value::from_json(&generated));
                1
            }
            Some(key_value) => {
                if self.changed.is_empty() {
                    return Ok(0);
                }

                let mut update = update::<T>();
                update.assignments = self
                    .values
                    .iter()
                    .filter(|(column, _)| self.changed.contains(column))
                    .cloned()
                    .collect();
                update.predicate = Some(Self::key_predicate(key, key_value));

                update.execute(executor).await?
            }
        };

        // an update that matched no row leaves the changes pending
        if affected > 0 {
            self.changed.clear();
        }
        Ok(affected)
    }

    /// Delete the stored row. A record without a key affects nothing.
    pub async fn delete<E: Executor>(&self, executor: &mut E) -> NestResult<u64> {
        let key = Self::primary_key()?;

        match self.key_value(key) {
            None => Ok(0),
            Some(key_value) => {
                let mut delete = delete_from::<T>();
                delete.predicate = Some(Self::key_predicate(key, key_value));

                delete.execute(executor).await
            }
        }
    }
}
