//!
//! Building predicates from typed columns.
//!
//! The right hand side of a comparison is either a value, bound as a
//! statement parameter, or another column. A column anchored at an
//! enclosing level of the projection is an outer reference: that is how
//! nested levels are correlated to their parents.
//!

use chrono::NaiveDate;

use crate::column::Column;
use crate::expr::{CompareOp, Expr, Predicate};
use crate::schema::{Instance, Relation};
use crate::ty::{Bind, Type};

/// Something comparable to a column of type `Ty`.
pub trait Operand<Ty> {
    fn into_expr(self) -> Expr;
}

impl<U, Ty> Operand<Ty> for Column<U, Ty>
where
    U: Relation + Instance,
    Ty: Type,
{
    fn into_expr(self) -> Expr {
        Expr::Column(self.column_ref())
    }
}

impl<'a, U, Ty> Operand<Ty> for &'a Column<U, Ty>
where
    U: Relation + Instance,
    Ty: Type,
{
    fn into_expr(self) -> Expr {
        Expr::Column(self.column_ref())
    }
}

macro_rules! value_operand {
    ($($ty:ty),*) => {
        $(
            impl Operand<$ty> for $ty {
                fn into_expr(self) -> Expr {
                    Expr::Value(Bind::<$ty>::bind_value(self))
                }
            }

            impl Operand<Option<$ty>> for $ty {
                fn into_expr(self) -> Expr {
                    Expr::Value(Bind::<Option<$ty>>::bind_value(self))
                }
            }
        )*
    };
}

value_operand!(bool, i16, i32, i64, f64, String, NaiveDate);

impl<'a> Operand<String> for &'a str {
    fn into_expr(self) -> Expr {
        Expr::Value(Bind::<String>::bind_value(self))
    }
}

impl<'a> Operand<Option<String>> for &'a str {
    fn into_expr(self) -> Expr {
        Expr::Value(Bind::<Option<String>>::bind_value(self))
    }
}

impl<T, Ty> Column<T, Ty>
where
    T: Relation + Instance,
    Ty: Type,
{
    fn compare(&self, op: CompareOp, rhs: impl Operand<Ty>) -> Predicate {
        Predicate::Compare(op, Expr::Column(self.column_ref()), rhs.into_expr())
    }

    pub fn eq(&self, rhs: impl Operand<Ty>) -> Predicate {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl Operand<Ty>) -> Predicate {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn lt(&self, rhs: impl Operand<Ty>) -> Predicate {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn le(&self, rhs: impl Operand<Ty>) -> Predicate {
        self.compare(CompareOp::Le, rhs)
    }

    pub fn gt(&self, rhs: impl Operand<Ty>) -> Predicate {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn ge(&self, rhs: impl Operand<Ty>) -> Predicate {
        self.compare(CompareOp::Ge, rhs)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull(Expr::Column(self.column_ref()))
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNotNull(Expr::Column(self.column_ref()))
    }
}
