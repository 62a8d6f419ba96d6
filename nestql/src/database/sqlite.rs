use super::{Database, Dialect};

#[derive(Clone, Debug)]
pub struct Sqlite;

impl Database for Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
}

#[cfg(feature = "sqlite")]
super::exec::sqlx_executor!(Sqlite, sqlx::Sqlite, sqlx::SqliteConnection, sqlx::SqlitePool);
