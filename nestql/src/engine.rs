//!
//! The query compiler.
//!
//! Compilation happens in two passes. Planning walks the projection tree
//! depth first with a stack of scopes, one per level, allocating table
//! aliases, resolving implicit joins and checking that every nested level
//! is correlated to its parent. Rendering then writes one statement for
//! the whole planned tree.
//!

use crate::builder::QueryBuilder;
use crate::column::{ColumnRef, Direction, OrderBy};
use crate::database::Dialect;
use crate::expr::{CompareOp, Expr, Predicate};
use crate::filter::RowRange;
use crate::schema::{ForeignKeyDef, Relation};
use crate::ty::Value;
use crate::{NestError, NestResult};

/// Executable statement text together with its bound parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
    relation: &'static str,
}

impl Statement {
    pub(crate) fn new(builder: QueryBuilder, relation: &'static str) -> Self {
        let (sql, params) = builder.build();
        Self {
            sql,
            params,
            relation,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The relation the statement is anchored at.
    pub fn relation(&self) -> &'static str {
        self.relation
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.sql)
    }
}

/// A correlation through a declared to-many foreign key of `source`.
#[derive(Clone)]
pub struct Link {
    pub source: &'static dyn Relation,
    pub name: &'static str,
}

struct Scope {
    relation: &'static dyn Relation,
    alias: u16,
    joins: Vec<Join>,
}

/// An implicit join, owned by the scope its path starts from.
struct Join {
    path: Vec<&'static str>,
    fk: &'static ForeignKeyDef,
    source_alias: u16,
    target: &'static dyn Relation,
    alias: u16,
}

#[derive(Clone, Copy, Debug)]
struct Resolved {
    alias: u16,
    name: &'static str,
    depth: usize,
}

#[derive(Debug)]
pub enum Operand {
    Column { alias: u16, name: &'static str },
    Value(Value),
}

/// A predicate with every column resolved to an alias.
#[derive(Debug)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Compare(CompareOp, Operand, Operand),
    IsNull(Operand),
    IsNotNull(Operand),
}

pub struct Planner {
    scopes: Vec<Scope>,
    next_alias: u16,
}

impl Planner {
    pub fn new() -> Self {
        Self {
            scopes: vec![],
            next_alias: 0,
        }
    }

    fn allocate_alias(&mut self) -> u16 {
        let alias = self.next_alias;
        self.next_alias += 1;
        alias
    }

    pub fn enter(&mut self, relation: &'static dyn Relation) {
        let alias = self.allocate_alias();
        self.scopes.push(Scope {
            relation,
            alias,
            joins: vec![],
        });
    }

    fn current(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn parent_name(&self) -> &'static str {
        match self.scopes.len() {
            0 | 1 => self.current().relation.name(),
            len => self.scopes[len - 2].relation.name(),
        }
    }

    /// Find the innermost scope selecting from `relation`.
    fn locate(&self, relation: &dyn Relation) -> Option<usize> {
        self.scopes
            .iter()
            .rposition(|scope| scope.relation.name() == relation.name())
    }

    /// Resolve a column within the scope at `index`,
    /// adding implicit joins to that scope as needed.
    fn resolve_in(&mut self, index: usize, column: &ColumnRef) -> NestResult<Resolved> {
        let depth = self.scopes.len() - 1 - index;
        let next_alias = &mut self.next_alias;
        let scope = &mut self.scopes[index];

        let mut relation = scope.relation;
        let mut alias = scope.alias;

        for (step_idx, step) in column.path.iter().enumerate() {
            let fk = relation
                .foreign_key(step)
                .ok_or(NestError::SchemaMismatch {
                    relation: relation.name(),
                    column: *step,
                    detail: "no such foreign key",
                })?;

            if fk.many {
                return Err(NestError::SchemaMismatch {
                    relation: relation.name(),
                    column: *step,
                    detail: "implicit joins must follow to-one foreign keys",
                });
            }

            let target = (fk.target)();
            let prefix = &column.path[..=step_idx];

            let existing = scope
                .joins
                .iter()
                .find(|join| join.path == prefix)
                .map(|join| join.alias);

            alias = match existing {
                Some(join_alias) => join_alias,
                None => {
                    let join_alias = *next_alias;
                    *next_alias += 1;
                    scope.joins.push(Join {
                        path: prefix.to_vec(),
                        fk,
                        source_alias: alias,
                        target,
                        alias: join_alias,
                    });
                    join_alias
                }
            };
            relation = target;
        }

        if relation.column(column.name).is_none() {
            return Err(NestError::SchemaMismatch {
                relation: relation.name(),
                column: column.name,
                detail: "no such column",
            });
        }

        Ok(Resolved {
            alias,
            name: column.name,
            depth,
        })
    }

    /// Resolve a column selected by the current level.
    pub fn resolve_scalar(&mut self, column: &ColumnRef) -> NestResult<QueryField> {
        let current = self.current().relation;
        if column.anchor.name() != current.name() {
            return Err(NestError::SchemaMismatch {
                relation: current.name(),
                column: column.name,
                detail: "column does not belong to the selected relation",
            });
        }

        let resolved = self.resolve_in(self.scopes.len() - 1, column)?;
        Ok(QueryField::Primitive {
            alias: resolved.alias,
            name: resolved.name,
        })
    }

    /// Resolve a column referenced from a predicate or ordering: either local,
    /// or an outer reference into the innermost enclosing level with that relation.
    fn resolve_reference(&mut self, column: &ColumnRef) -> NestResult<Resolved> {
        match self.locate(column.anchor) {
            Some(index) => self.resolve_in(index, column),
            None if self.scopes.len() == 1 => Err(NestError::SchemaMismatch {
                relation: self.current().relation.name(),
                column: column.name,
                detail: "column does not belong to the selected relation",
            }),
            None => Err(NestError::Correlation {
                parent: self.parent_name(),
                child: self.current().relation.name(),
                detail: format!("`{:?}` does not refer to an enclosing relation", column),
            }),
        }
    }

    fn resolve_operand(&mut self, expr: &Expr, parent_refs: &mut usize) -> NestResult<Operand> {
        match expr {
            Expr::Column(column) => {
                let resolved = self.resolve_reference(column)?;
                if resolved.depth == 1 {
                    *parent_refs += 1;
                }
                Ok(Operand::Column {
                    alias: resolved.alias,
                    name: resolved.name,
                })
            }
            Expr::Value(value) => Ok(Operand::Value(value.clone())),
        }
    }

    /// Resolve a predicate, counting references to the immediate parent level.
    pub fn resolve_predicate(
        &mut self,
        predicate: &Predicate,
        parent_refs: &mut usize,
    ) -> NestResult<Condition> {
        Ok(match predicate {
            Predicate::And(clauses) => Condition::And(
                clauses
                    .iter()
                    .map(|clause| self.resolve_predicate(clause, parent_refs))
                    .collect::<NestResult<_>>()?,
            ),
            Predicate::Or(clauses) => Condition::Or(
                clauses
                    .iter()
                    .map(|clause| self.resolve_predicate(clause, parent_refs))
                    .collect::<NestResult<_>>()?,
            ),
            Predicate::Compare(op, lhs, rhs) => Condition::Compare(
                *op,
                self.resolve_operand(lhs, parent_refs)?,
                self.resolve_operand(rhs, parent_refs)?,
            ),
            Predicate::IsNull(expr) => Condition::IsNull(self.resolve_operand(expr, parent_refs)?),
            Predicate::IsNotNull(expr) => {
                Condition::IsNotNull(self.resolve_operand(expr, parent_refs)?)
            }
        })
    }

    /// Resolve a to-many link into equalities between the current level and the link source.
    pub fn resolve_link(&mut self, link: &Link, parent_refs: &mut usize) -> NestResult<Condition> {
        let child = self.current().relation;
        let correlation_error = |detail: &str| NestError::Correlation {
            parent: link.source.name(),
            child: child.name(),
            detail: format!("foreign key `{}`: {}", link.name, detail),
        };

        let fk = link
            .source
            .foreign_key(link.name)
            .ok_or_else(|| correlation_error("not declared"))?;

        if !fk.many || (fk.target)().name() != child.name() {
            return Err(correlation_error("does not lead to the nested relation"));
        }

        let source_index = match self.locate(link.source) {
            Some(index) if index + 1 < self.scopes.len() => index,
            _ => return Err(correlation_error("source is not an enclosing relation")),
        };

        let child_index = self.scopes.len() - 1;
        let mut clauses = Vec::with_capacity(fk.pairs.len());
        for (local, foreign) in fk.pairs {
            let outer = self.resolve_in(
                source_index,
                &ColumnRef {
                    anchor: link.source,
                    path: vec![],
                    name: *local,
                },
            )?;
            let inner = self.resolve_in(
                child_index,
                &ColumnRef {
                    anchor: child,
                    path: vec![],
                    name: *foreign,
                },
            )?;
            if outer.depth == 1 {
                *parent_refs += 1;
            }
            clauses.push(Condition::Compare(
                CompareOp::Eq,
                Operand::Column {
                    alias: inner.alias,
                    name: inner.name,
                },
                Operand::Column {
                    alias: outer.alias,
                    name: outer.name,
                },
            ));
        }

        Ok(Condition::And(clauses))
    }

    pub fn resolve_order(&mut self, order: &OrderBy) -> NestResult<(Operand, Direction)> {
        let resolved = self.resolve_reference(&order.column)?;
        Ok((
            Operand::Column {
                alias: resolved.alias,
                name: resolved.name,
            },
            order.direction,
        ))
    }

    /// Check that the current nested level refers to its parent at least once.
    pub fn require_correlation(&self, parent_refs: usize) -> NestResult<()> {
        if self.scopes.len() > 1 && parent_refs == 0 {
            return Err(NestError::Correlation {
                parent: self.parent_name(),
                child: self.current().relation.name(),
                detail: "nested selection has no predicate referring to its parent".to_string(),
            });
        }
        Ok(())
    }

    /// Close the current scope, producing the planned select.
    pub fn exit(
        &mut self,
        projection: Vec<QueryField>,
        predicate: Option<Condition>,
        order: Vec<(Operand, Direction)>,
        range: RowRange,
    ) -> Select {
        let nested = self.scopes.len() > 1;
        let range_alias = if nested && !range.is_unbounded() {
            Some(self.allocate_alias())
        } else {
            None
        };

        let scope = self
            .scopes
            .pop()
            .expect("exit is always paired with a preceding enter");

        Select {
            relation: scope.relation,
            alias: scope.alias,
            joins: scope.joins,
            projection,
            predicate,
            order,
            range,
            range_alias,
        }
    }
}

/// # Select
///
/// One planned level of a projection: a select from one relation,
/// with its implicit joins, projected fields and nested selects.
///
pub struct Select {
    relation: &'static dyn Relation,
    alias: u16,
    joins: Vec<Join>,
    projection: Vec<QueryField>,
    predicate: Option<Condition>,
    order: Vec<(Operand, Direction)>,
    range: RowRange,
    /// Alias of the derived table a ranged nested level aggregates over.
    range_alias: Option<u16>,
}

pub enum QueryField {
    Primitive { alias: u16, name: &'static str },
    Foreign(Box<Select>),
}

impl Select {
    pub fn relation(&self) -> &'static dyn Relation {
        self.relation
    }

    /// Render as the root of a statement: one JSON array per row.
    pub fn build_root(&self, builder: &mut QueryBuilder) {
        builder.push("SELECT ");
        self.build_row(builder);
        if builder.dialect() == Dialect::Postgres {
            builder.push("::text");
        }
        self.build_from(builder);
        self.build_where(builder);
        self.build_order(builder);
        self.build_range(builder);
    }

    fn build_row(&self, builder: &mut QueryBuilder) {
        builder.push(match builder.dialect() {
            Dialect::Sqlite => "json_array(",
            Dialect::Postgres => "json_build_array(",
        });
        for (idx, field) in self.projection.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            match field {
                QueryField::Primitive { alias, name } => builder.push_column(*alias, name),
                QueryField::Foreign(select) => select.build_nested(builder),
            }
        }
        builder.push(")");
    }

    /// Render as a correlated sub-select aggregating its rows into one JSON array.
    fn build_nested(&self, builder: &mut QueryBuilder) {
        let dialect = builder.dialect();

        // SQLite drops the JSON subtype of sub-select results; json() restores it
        // so the array is embedded rather than quoted as text.
        if dialect == Dialect::Sqlite {
            builder.push("json(");
        }
        builder.push("(SELECT ");
        builder.push(match dialect {
            Dialect::Sqlite => "json_group_array(",
            Dialect::Postgres => "COALESCE(json_agg(",
        });

        match self.range_alias {
            None => {
                self.build_row(builder);
                self.build_order(builder);
                builder.push(aggregate_close(dialect));
                self.build_from(builder);
                self.build_where(builder);
            }
            Some(range_alias) => {
                match dialect {
                    Dialect::Sqlite => {
                        builder.push("json(");
                        builder.push_column(range_alias, "e");
                        builder.push(")");
                    }
                    Dialect::Postgres => builder.push_column(range_alias, "e"),
                }
                for (idx, (_, direction)) in self.order.iter().enumerate() {
                    builder.push(if idx == 0 { " ORDER BY " } else { ", " });
                    builder.push_column(range_alias, &format!("o{}", idx));
                    builder.push(direction_sql(*direction));
                }
                builder.push(aggregate_close(dialect));
                builder.push(" FROM (SELECT ");
                self.build_row(builder);
                builder.push(" AS \"e\"");
                for (idx, (operand, _)) in self.order.iter().enumerate() {
                    builder.push(", ");
                    build_operand(operand, builder);
                    builder.push(&format!(" AS \"o{}\"", idx));
                }
                self.build_from(builder);
                self.build_where(builder);
                self.build_order(builder);
                self.build_range(builder);
                builder.push(") AS ");
                builder.push_alias(range_alias);
            }
        }

        builder.push(")");
        if dialect == Dialect::Sqlite {
            builder.push(")");
        }
    }

    fn build_from(&self, builder: &mut QueryBuilder) {
        builder.push(" FROM ");
        builder.push_ident(self.relation.name());
        builder.push(" AS ");
        builder.push_alias(self.alias);

        for join in &self.joins {
            builder.push(" LEFT JOIN ");
            builder.push_ident(join.target.name());
            builder.push(" AS ");
            builder.push_alias(join.alias);
            builder.push(" ON ");
            for (idx, (local, foreign)) in join.fk.pairs.iter().enumerate() {
                if idx > 0 {
                    builder.push(" AND ");
                }
                builder.push_column(join.alias, foreign);
                builder.push(" = ");
                builder.push_column(join.source_alias, local);
            }
        }
    }

    fn build_where(&self, builder: &mut QueryBuilder) {
        if let Some(predicate) = &self.predicate {
            builder.push(" WHERE ");
            build_condition(predicate, builder, true);
        }
    }

    fn build_order(&self, builder: &mut QueryBuilder) {
        for (idx, (operand, direction)) in self.order.iter().enumerate() {
            builder.push(if idx == 0 { " ORDER BY " } else { ", " });
            build_operand(operand, builder);
            builder.push(direction_sql(*direction));
        }
    }

    fn build_range(&self, builder: &mut QueryBuilder) {
        match (self.range.limit, builder.dialect()) {
            (Some(limit), _) => {
                builder.push(" LIMIT ");
                builder.push_u64(limit);
            }
            // SQLite only accepts OFFSET after a LIMIT
            (None, Dialect::Sqlite) if self.range.offset.is_some() => builder.push(" LIMIT -1"),
            (None, _) => {}
        }
        if let Some(offset) = self.range.offset {
            builder.push(" OFFSET ");
            builder.push_u64(offset);
        }
    }
}

fn aggregate_close(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => ")",
        Dialect::Postgres => "), '[]'::json)",
    }
}

fn direction_sql(direction: Direction) -> &'static str {
    match direction {
        Direction::Asc => " ASC",
        Direction::Desc => " DESC",
    }
}

pub fn build_operand(operand: &Operand, builder: &mut QueryBuilder) {
    match operand {
        Operand::Column { alias, name } => builder.push_column(*alias, name),
        Operand::Value(value) => builder.push_param(value.clone()),
    }
}

pub fn build_condition(condition: &Condition, builder: &mut QueryBuilder, top_level: bool) {
    match condition {
        Condition::And(clauses) | Condition::Or(clauses) if clauses.is_empty() => {
            builder.push(match condition {
                Condition::And(_) => "1 = 1",
                _ => "1 = 0",
            });
        }
        Condition::And(clauses) | Condition::Or(clauses) => {
            let separator = match condition {
                Condition::And(_) => " AND ",
                _ => " OR ",
            };
            let parenthesize = !top_level && clauses.len() > 1;
            if parenthesize {
                builder.push("(");
            }
            for (idx, clause) in clauses.iter().enumerate() {
                if idx > 0 {
                    builder.push(separator);
                }
                build_condition(clause, builder, false);
            }
            if parenthesize {
                builder.push(")");
            }
        }
        Condition::Compare(op, lhs, rhs) => {
            build_operand(lhs, builder);
            builder.push(" ");
            builder.push(op.as_sql());
            builder.push(" ");
            build_operand(rhs, builder);
        }
        Condition::IsNull(operand) => {
            build_operand(operand, builder);
            builder.push(" IS NULL");
        }
        Condition::IsNotNull(operand) => {
            build_operand(operand, builder);
            builder.push(" IS NOT NULL");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(alias: u16, name: &'static str) -> Operand {
        Operand::Column { alias, name }
    }

    fn render(condition: &Condition) -> String {
        let mut builder = QueryBuilder::new(Dialect::Sqlite);
        build_condition(condition, &mut builder, true);
        builder.build().0
    }

    #[test]
    fn empty_logic_is_constant() {
        assert_eq!(render(&Condition::And(vec![])), "1 = 1");
        assert_eq!(render(&Condition::Or(vec![])), "1 = 0");
    }

    #[test]
    fn nested_logic_is_parenthesized() {
        let condition = Condition::Or(vec![
            Condition::And(vec![
                Condition::IsNull(column(0, "club_id")),
                Condition::Compare(CompareOp::Ge, column(0, "year_of_birth"), Operand::Value(Value::I32(2000))),
            ]),
            Condition::And(vec![Condition::IsNotNull(column(1, "name"))]),
        ]);

        assert_eq!(
            render(&condition),
            "(\"t0\".\"club_id\" IS NULL AND \"t0\".\"year_of_birth\" >= ?) OR \"t1\".\"name\" IS NOT NULL"
        );
    }

    #[test]
    fn range_renders_per_dialect() {
        let select = |range| Select {
            relation: &DUMMY,
            alias: 0,
            joins: vec![],
            projection: vec![],
            predicate: None,
            order: vec![],
            range,
            range_alias: None,
        };

        let mut sqlite = QueryBuilder::new(Dialect::Sqlite);
        select(RowRange {
            limit: None,
            offset: Some(5),
        })
        .build_range(&mut sqlite);
        assert_eq!(sqlite.build().0, " LIMIT -1 OFFSET 5");

        let mut postgres = QueryBuilder::new(Dialect::Postgres);
        select(RowRange {
            limit: Some(10),
            offset: Some(5),
        })
        .build_range(&mut postgres);
        assert_eq!(postgres.build().0, " LIMIT 10 OFFSET 5");
    }

    #[test]
    fn scopes_allocate_aliases_in_order() {
        let mut planner = Planner::new();
        planner.enter(&DUMMY);
        planner.enter(&DUMMY);
        assert!(matches!(
            planner.require_correlation(0),
            Err(NestError::Correlation { .. })
        ));

        let nested = planner.exit(vec![], None, vec![], RowRange { limit: Some(1), offset: None });
        assert_eq!(nested.alias, 1);
        assert_eq!(nested.range_alias, Some(2));

        let root = planner.exit(vec![], None, vec![], RowRange { limit: Some(1), offset: None });
        assert_eq!(root.alias, 0);
        assert_eq!(root.range_alias, None);
    }

    struct Dummy;

    static DUMMY: Dummy = Dummy;

    impl Relation for Dummy {
        fn name(&self) -> &'static str {
            "dummy"
        }

        fn columns(&self) -> &'static [crate::schema::ColumnDef] {
            &[]
        }

        fn primary_key(&self) -> &'static [&'static str] {
            &[]
        }

        fn foreign_keys(&self) -> &'static [ForeignKeyDef] {
            &[]
        }
    }
}
