//!
//! The sqlx-backed [`Executor`](super::Executor) implementations.
//!
//! Both stores run statements the same way, so one macro expands to the
//! helpers and the connection and pool impls for each of them.
//!

#[allow(unused_macros)]
macro_rules! sqlx_executor {
    ($database:ident, $sqlx_db:ty, $conn:ty, $pool:ty) => {
        mod exec {
            use async_trait::async_trait;
            use futures_util::TryStreamExt;
            use sqlx::Row;

            use super::$database;
            use crate::database::{store_error, Executor};
            use crate::engine::Statement;
            use crate::ty::Value;
            use crate::NestResult;

            type Query<'q> =
                sqlx::query::Query<'q, $sqlx_db, <$sqlx_db as sqlx::Database>::Arguments<'q>>;

            fn bind<'q>(query: Query<'q>, value: &'q Value) -> Query<'q> {
                match value {
                    // rendered as a literal, never bound
                    Value::Null => query.bind(None::<i64>),
                    Value::Bool(value) => query.bind(*value),
                    Value::I16(value) => query.bind(*value),
                    Value::I32(value) => query.bind(*value),
                    Value::I64(value) => query.bind(*value),
                    Value::F64(value) => query.bind(*value),
                    Value::Text(value) => query.bind(value.as_str()),
                    Value::Date(value) => query.bind(*value),
                }
            }

            fn prepare(statement: &Statement) -> Query<'_> {
                tracing::debug!(
                    relation = statement.relation(),
                    sql = %statement.sql(),
                    params = statement.params().len(),
                    "nestql.query"
                );

                statement
                    .params()
                    .iter()
                    .fold(sqlx::query(statement.sql()), bind)
            }

            async fn fetch_rows(
                conn: &mut $conn,
                statement: &Statement,
            ) -> NestResult<Vec<String>> {
                let relation = statement.relation();
                let mut stream = prepare(statement).fetch(conn);
                let mut rows = vec![];

                while let Some(row) = stream
                    .try_next()
                    .await
                    .map_err(|err| store_error(relation, err))?
                {
                    rows.push(
                        row.try_get::<String, _>(0)
                            .map_err(|err| store_error(relation, err))?,
                    );
                }

                Ok(rows)
            }

            async fn execute(conn: &mut $conn, statement: &Statement) -> NestResult<u64> {
                let result = prepare(statement)
                    .execute(conn)
                    .await
                    .map_err(|err| store_error(statement.relation(), err))?;

                Ok(result.rows_affected())
            }

            #[async_trait]
            impl Executor for $conn {
                type DB = $database;

                async fn fetch_rows(&mut self, statement: &Statement) -> NestResult<Vec<String>> {
                    fetch_rows(self, statement).await
                }

                async fn execute(&mut self, statement: &Statement) -> NestResult<u64> {
                    execute(self, statement).await
                }
            }

            #[async_trait]
            impl Executor for $pool {
                type DB = $database;

                async fn fetch_rows(&mut self, statement: &Statement) -> NestResult<Vec<String>> {
                    let mut conn = self
                        .acquire()
                        .await
                        .map_err(|err| store_error(statement.relation(), err))?;
                    fetch_rows(&mut conn, statement).await
                }

                async fn execute(&mut self, statement: &Statement) -> NestResult<u64> {
                    let mut conn = self
                        .acquire()
                        .await
                        .map_err(|err| store_error(statement.relation(), err))?;
                    execute(&mut conn, statement).await
                }
            }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use sqlx_executor;
