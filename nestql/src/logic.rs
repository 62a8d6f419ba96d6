use crate::expr::Predicate;

enum LogicOp {
    And,
    Or,
}

impl Predicate {
    /// Logical conjunction. Nested conjunctions are flattened.
    pub fn and(self, rhs: Predicate) -> Predicate {
        optimize(LogicOp::And, vec![self, rhs])
    }

    /// Logical disjunction. Nested disjunctions are flattened.
    pub fn or(self, rhs: Predicate) -> Predicate {
        optimize(LogicOp::Or, vec![self, rhs])
    }
}

fn optimize(op: LogicOp, clause_iter: Vec<Predicate>) -> Predicate {
    let mut clauses = Vec::with_capacity(clause_iter.len());
    for clause in clause_iter {
        match (&op, clause) {
            (LogicOp::And, Predicate::And(inner)) => clauses.extend(inner),
            (LogicOp::Or, Predicate::Or(inner)) => clauses.extend(inner),
            (_, clause) => clauses.push(clause),
        }
    }

    if clauses.len() == 1 {
        if let Some(clause) = clauses.pop() {
            return clause;
        }
    }

    match op {
        LogicOp::And => Predicate::And(clauses),
        LogicOp::Or => Predicate::Or(clauses),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::ty::Value;

    fn is_null(value: i64) -> Predicate {
        Predicate::IsNull(Expr::Value(Value::I64(value)))
    }

    #[test]
    fn nested_conjunctions_are_flattened() {
        let predicate = is_null(1).and(is_null(2)).and(is_null(3).and(is_null(4)));
        match predicate {
            Predicate::And(clauses) => assert_eq!(clauses.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn single_clause_is_unwrapped() {
        assert!(matches!(
            optimize(LogicOp::And, vec![is_null(1)]),
            Predicate::IsNull(_)
        ));
    }

    #[test]
    fn mixed_operators_keep_structure() {
        let predicate = is_null(1).or(is_null(2)).and(is_null(3));
        match predicate {
            Predicate::And(clauses) => {
                assert_eq!(clauses.len(), 2);
                assert!(matches!(clauses[0], Predicate::Or(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
