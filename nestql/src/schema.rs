//!
//! Schema metadata: relations, their columns and foreign keys.
//!
//! Relations are usually declared through the `#[nestql::table]` attribute,
//! which generates the `Relation` and `Instance` implementations below
//! together with typed column accessors.
//!

use crate::{NestError, NestResult};

/// A table known to the projection builder.
pub trait Relation: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn columns(&self) -> &'static [ColumnDef];

    fn primary_key(&self) -> &'static [&'static str];

    fn foreign_keys(&self) -> &'static [ForeignKeyDef];

    fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns().iter().find(|column| column.name == name)
    }

    fn foreign_key(&self, name: &str) -> Option<&'static ForeignKeyDef> {
        self.foreign_keys().iter().find(|fk| fk.name == name)
    }
}

/// Provide some &'static instance of a type.
pub trait Instance {
    fn instance() -> &'static Self;
}

#[derive(Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub nullable: bool,
}

/// A named link from one relation to another.
///
/// `pairs` holds `(local column, foreign column)` equalities. When `many`
/// is set, rows of the target relation reference this one, so following
/// the link yields a collection rather than a single row.
pub struct ForeignKeyDef {
    pub name: &'static str,
    pub target: fn() -> &'static dyn Relation,
    pub pairs: &'static [(&'static str, &'static str)],
    pub many: bool,
}

impl std::fmt::Debug for ForeignKeyDef {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            fmt,
            "ForeignKeyDef({} -> {}, {:?}, many: {})",
            self.name,
            (self.target)().name(),
            self.pairs,
            self.many
        )
    }
}

/// A set of relations, validated as a whole.
pub struct Schema {
    relations: Vec<&'static dyn Relation>,
}

impl Schema {
    pub fn new(relations: Vec<&'static dyn Relation>) -> Self {
        Self { relations }
    }

    pub fn relation(&self, name: &str) -> Option<&'static dyn Relation> {
        self.relations
            .iter()
            .copied()
            .find(|relation| relation.name() == name)
    }

    pub fn relations(&self) -> &[&'static dyn Relation] {
        &self.relations
    }

    /// Check that every primary key and foreign key refers to declared columns
    /// on both sides of the link.
    pub fn validate(&self) -> NestResult<()> {
        for relation in &self.relations {
            for key in relation.primary_key() {
                if relation.column(key).is_none() {
                    return Err(NestError::SchemaMismatch {
                        relation: relation.name(),
                        column: *key,
                        detail: "primary key column is not declared",
                    });
                }
            }

            for fk in relation.foreign_keys() {
                let target = (fk.target)();
                if fk.pairs.is_empty() {
                    return Err(NestError::SchemaMismatch {
                        relation: relation.name(),
                        column: fk.name,
                        detail: "foreign key has no column pairs",
                    });
                }
                for (local, foreign) in fk.pairs {
                    if relation.column(local).is_none() {
                        return Err(NestError::SchemaMismatch {
                            relation: relation.name(),
                            column: *local,
                            detail: "foreign key column is not declared",
                        });
                    }
                    if target.column(foreign).is_none() {
                        return Err(NestError::SchemaMismatch {
                            relation: target.name(),
                            column: *foreign,
                            detail: "referenced column is not declared",
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
