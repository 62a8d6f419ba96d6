//!
//! Databases and executors.
//!
//! A [`Database`] selects the SQL dialect a statement is rendered in.
//! An [`Executor`] is the connection-like handle statements run on. Every
//! row a compiled projection returns is a single text column holding a
//! JSON array, so executors only ever deal with strings.
//!

use async_trait::async_trait;

use crate::engine::Statement;
use crate::{NestError, NestResult};

mod exec;
pub mod postgres;
pub mod sqlite;

pub use postgres::Postgres;
pub use sqlite::Sqlite;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

pub trait Database: std::fmt::Debug + Sync + Send + Clone + 'static {
    const DIALECT: Dialect;
}

#[async_trait]
pub trait Executor: Send {
    type DB: Database;

    /// Run a statement producing one JSON payload per row.
    async fn fetch_rows(&mut self, statement: &Statement) -> NestResult<Vec<String>>;

    /// Run a statement, returning the number of affected rows.
    async fn execute(&mut self, statement: &Statement) -> NestResult<u64>;
}

/// Classify an error reported by the store.
pub(crate) fn store_error(relation: &'static str, error: sqlx::Error) -> NestError {
    match error {
        sqlx::Error::Database(db_error) => {
            let detail = db_error.message().to_string();
            if is_constraint_violation(&*db_error) {
                NestError::ConstraintViolation { relation, detail }
            } else {
                NestError::Database { relation, detail }
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => NestError::Transport(error.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => NestError::Decode {
            relation,
            detail: error.to_string(),
        },
        error => NestError::Database {
            relation,
            detail: error.to_string(),
        },
    }
}

fn is_constraint_violation(db_error: &dyn sqlx::error::DatabaseError) -> bool {
    use sqlx::error::ErrorKind;

    match db_error.kind() {
        ErrorKind::UniqueViolation
        | ErrorKind::ForeignKeyViolation
        | ErrorKind::NotNullViolation
        | ErrorKind::CheckViolation => true,
        _ => match db_error.code() {
            // SQLite extended result codes keep SQLITE_CONSTRAINT (19) in the low byte
            Some(code) => match code.parse::<i64>() {
                Ok(number) => number & 0xff == 19,
                // SQLSTATE class 23: integrity constraint violation
                Err(_) => code.starts_with("23"),
            },
            None => false,
        },
    }
}
