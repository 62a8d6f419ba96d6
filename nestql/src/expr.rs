//!
//! Untyped expressions and predicates, produced by the typed column API.
//!

use crate::column::ColumnRef;
use crate::ty::Value;

#[derive(Clone, Debug)]
pub enum Expr {
    Column(ColumnRef),
    Value(Value),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare(CompareOp, Expr, Expr),
    IsNull(Expr),
    IsNotNull(Expr),
}

impl Predicate {
    /// Visit every column referenced by this predicate.
    pub(crate) fn columns(&self) -> Vec<&ColumnRef> {
        let mut columns = vec![];
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Predicate::And(clauses) | Predicate::Or(clauses) => {
                for clause in clauses {
                    clause.collect_columns(out);
                }
            }
            Predicate::Compare(_, lhs, rhs) => {
                for expr in [lhs, rhs] {
                    if let Expr::Column(column) = expr {
                        out.push(column);
                    }
                }
            }
            Predicate::IsNull(expr) | Predicate::IsNotNull(expr) => {
                if let Expr::Column(column) = expr {
                    out.push(column);
                }
            }
        }
    }
}
