//!
//! ```text
//! competition
//!  └── categories        (category.series_id = competition.series_id)
//!       └── athletes     (category_athlete.category_id = category.id)
//!            └── results (result.athlete_id = athlete.id
//!                         AND result.category_id = category.id
//!                         AND result.competition_id = competition.id)
//! ```
//!
//! `nestql` builds hierarchical projections: a tree of [`Node`]s, where every
//! level selects scalar columns from one relation plus any number of nested
//! [`multiset`]s correlated to the enclosing rows.
//!
//! The whole tree compiles into a single statement. Each nested level becomes
//! a correlated sub-select that aggregates its rows into one JSON array value,
//! so fetching a tree costs exactly one round trip no matter how deep it is.
//! The materializer then walks the returned payload and calls the per-level
//! mapping functions, innermost first, producing plain immutable records.
//!

pub use nestql_macros::*;

pub mod builder;
pub mod column;
pub mod database;
pub mod expr;
pub mod filter;
pub mod mutate;
pub mod predicate;
pub mod prelude;
pub mod project;
pub mod quantify;
pub mod record;
pub mod schema;
pub mod ty;

mod engine;
mod logic;

pub use column::{Column, Foreign, OneToMany, OneToOne, OrderBy};
pub use database::{Database, Executor, Postgres, Sqlite};
pub use engine::Statement;
pub use mutate::{delete_from, insert_into, update};
pub use project::{multiset, select, Multiset, Node, Select};
pub use record::Record;
pub use schema::{Instance, Relation, Schema};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NestError {
    /// A referenced column or foreign key is not declared by the relation.
    #[error("Schema mismatch on `{relation}`.`{column}`: {detail}")]
    SchemaMismatch {
        relation: &'static str,
        column: &'static str,
        detail: &'static str,
    },

    /// A nested level could not be correlated to its enclosing levels.
    #[error("Correlation error between `{parent}` and `{child}`: {detail}")]
    Correlation {
        parent: &'static str,
        child: &'static str,
        detail: String,
    },

    /// The returned payload does not have the shape the projection declared.
    #[error("Decode error in `{relation}`: {detail}")]
    Decode {
        relation: &'static str,
        detail: String,
    },

    #[error("Constraint violation on `{relation}`: {detail}")]
    ConstraintViolation {
        relation: &'static str,
        detail: String,
    },

    /// Any other error reported by the store.
    #[error("Database error on `{relation}`: {detail}")]
    Database {
        relation: &'static str,
        detail: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No row found in `{relation}`")]
    NotFound { relation: &'static str },

    #[error("More than one row found in `{relation}`")]
    TooManyRows { relation: &'static str },
}

pub type NestResult<T> = Result<T, NestError>;
