use super::{Database, Dialect};

#[derive(Clone, Debug)]
pub struct Postgres;

impl Database for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
}

#[cfg(feature = "postgres")]
super::exec::sqlx_executor!(Postgres, sqlx::Postgres, sqlx::PgConnection, sqlx::PgPool);
