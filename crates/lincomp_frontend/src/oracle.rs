use std::collections::BTreeSet;
use thiserror::Error;

use lincomp_common::data::condition::{Condition, Predicate};
use lincomp_common::data::expr::{Expr, ExprKind, Kind};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("cannot decide `{0}`: it still mentions pattern variables")]
    Unbound(Condition),
}

/// Decides side conditions of operation descriptors.
pub trait Oracle {
    fn ask(&self, condition: &Condition) -> Result<bool, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &O {
    fn ask(&self, condition: &Condition) -> Result<bool, OracleError> {
        (**self).ask(condition)
    }
}

/// The reference oracle: a set of asserted facts, closed under a handful of structural rules.
///
/// Answers are conservative. A predicate that neither a fact nor a rule establishes is reported
/// as not holding.
#[derive(Clone, Debug, Default)]
pub struct Assumptions {
    facts: BTreeSet<(Predicate, Expr)>,
}

impl Assumptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_facts(facts: impl IntoIterator<Item = (Predicate, Expr)>) -> Self {
        Assumptions {
            facts: facts.into_iter().collect(),
        }
    }

    pub fn assume(&mut self, predicate: Predicate, expr: Expr) {
        self.facts.insert((predicate, expr));
    }

    fn known(&self, predicate: Predicate, expr: &Expr) -> bool {
        self.facts.contains(&(predicate, expr.clone()))
    }

    pub fn holds(&self, predicate: Predicate, expr: &Expr) -> bool {
        if self.known(predicate, expr) {
            return true;
        }
        match predicate {
            Predicate::Symmetric => self.symmetric(expr),
            Predicate::PositiveDefinite => self.positive_definite(expr),
            Predicate::Invertible => self.invertible(expr),
            Predicate::Orthogonal => self.orthogonal(expr),
            Predicate::LowerTriangular | Predicate::UpperTriangular => {
                self.triangular(predicate, expr)
            }
        }
    }

    fn symmetric(&self, expr: &Expr) -> bool {
        if expr.kind() == Kind::Scalar {
            return true;
        }
        match expr.data() {
            ExprKind::ZeroMatrix | ExprKind::IdentityMatrix => true,
            ExprKind::Transpose(arg) | ExprKind::Inverse(arg) => {
                self.holds(Predicate::Symmetric, arg)
            }
            ExprKind::Add(terms) => terms.iter().all(|t| self.holds(Predicate::Symmetric, t)),
            ExprKind::Mul(factors) => {
                let matrices: Vec<&Expr> = factors
                    .iter()
                    .filter(|f| f.kind() == Kind::Matrix)
                    .collect();
                self.palindromic(&matrices) || self.positive_definite(expr)
            }
            _ => self.positive_definite(expr),
        }
    }

    // `M*N*...*N.T*M.T`, with a symmetric middle factor when the count is odd.
    fn palindromic(&self, matrices: &[&Expr]) -> bool {
        let n = matrices.len();
        let mirrored = (0..n / 2).all(|i| *matrices[n - 1 - i] == matrices[i].t());
        mirrored && (n % 2 == 0 || self.holds(Predicate::Symmetric, matrices[n / 2]))
    }

    fn positive_definite(&self, expr: &Expr) -> bool {
        match expr.data() {
            ExprKind::IdentityMatrix => true,
            ExprKind::Transpose(arg) | ExprKind::Inverse(arg) => {
                self.holds(Predicate::PositiveDefinite, arg)
            }
            ExprKind::Mul(factors) => match factors.as_slice() {
                [left, right] if *left == right.t() => {
                    left.kind() == Kind::Matrix && self.holds(Predicate::Invertible, right)
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn invertible(&self, expr: &Expr) -> bool {
        match expr.data() {
            ExprKind::Num(value) => *value != 0,
            ExprKind::IdentityMatrix => true,
            ExprKind::Transpose(arg) | ExprKind::Inverse(arg) => {
                self.holds(Predicate::Invertible, arg)
            }
            ExprKind::Mul(factors) => factors
                .iter()
                .all(|f| self.holds(Predicate::Invertible, f)),
            _ => {
                expr.kind() == Kind::Matrix
                    && (self.positive_definite(expr) || self.orthogonal(expr))
            }
        }
    }

    fn orthogonal(&self, expr: &Expr) -> bool {
        match expr.data() {
            ExprKind::IdentityMatrix => true,
            ExprKind::Transpose(arg) | ExprKind::Inverse(arg) => {
                self.holds(Predicate::Orthogonal, arg)
            }
            ExprKind::Mul(factors) => factors.iter().all(|f| match f.data() {
                ExprKind::Num(value) => value.abs() == 1,
                _ => self.holds(Predicate::Orthogonal, f),
            }),
            _ => false,
        }
    }

    fn triangular(&self, predicate: Predicate, expr: &Expr) -> bool {
        let flipped = match predicate {
            Predicate::LowerTriangular => Predicate::UpperTriangular,
            _ => Predicate::LowerTriangular,
        };
        match expr.data() {
            ExprKind::ZeroMatrix | ExprKind::IdentityMatrix => true,
            ExprKind::Transpose(arg) => self.holds(flipped, arg),
            ExprKind::Inverse(arg) => self.holds(predicate, arg),
            ExprKind::Mul(factors) => factors
                .iter()
                .all(|f| f.kind() == Kind::Scalar || self.holds(predicate, f)),
            ExprKind::Add(terms) => terms.iter().all(|t| self.holds(predicate, t)),
            _ => false,
        }
    }
}

impl Oracle for Assumptions {
    fn ask(&self, condition: &Condition) -> Result<bool, OracleError> {
        match condition {
            Condition::True => Ok(true),
            Condition::False => Ok(false),
            Condition::Holds(predicate, expr) => {
                if expr.has_wilds() {
                    return Err(OracleError::Unbound(condition.clone()));
                }
                Ok(self.holds(*predicate, expr))
            }
            Condition::And(clauses) => {
                for clause in clauses {
                    if !self.ask(clause)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(clauses) => {
                for clause in clauses {
                    if self.ask(clause)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(inner) => Ok(!self.ask(inner)?),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_facts_and_rules() {
        let x = Expr::matrix("X");
        let y = Expr::matrix("Y");
        let a = Expr::scalar("a");
        let mut oracle = Assumptions::new();

        assert!(!oracle.holds(Predicate::Symmetric, &x));
        oracle.assume(Predicate::Symmetric, x.clone());
        assert!(oracle.holds(Predicate::Symmetric, &x));
        assert!(oracle.holds(Predicate::Symmetric, &x.t()));
        assert!(oracle.holds(Predicate::Symmetric, &x.inv()));
        assert!(oracle.holds(Predicate::Symmetric, &(a.clone() * x.clone())));
        assert!(oracle.holds(Predicate::Symmetric, &(y.clone() * x.clone() * y.t())));
        assert!(!oracle.holds(Predicate::Symmetric, &(x.clone() + y.clone())));
        assert!(oracle.holds(Predicate::Symmetric, &(y.clone() * y.t())));
        assert!(oracle.holds(Predicate::Symmetric, &Expr::identity_matrix()));

        // Gram matrices are only definite when the factor is invertible.
        let gram = y.t() * y.clone();
        assert!(!oracle.holds(Predicate::PositiveDefinite, &gram));
        oracle.assume(Predicate::Invertible, y.clone());
        assert!(oracle.holds(Predicate::PositiveDefinite, &gram));
        assert!(oracle.holds(Predicate::PositiveDefinite, &gram.inv()));
        assert!(oracle.holds(Predicate::Invertible, &gram));
        assert!(oracle.holds(Predicate::Invertible, &(y.clone() * gram.clone())));
    }

    #[test]
    fn test_triangular() {
        let l = Expr::matrix("L");
        let oracle = Assumptions::from_facts([(Predicate::LowerTriangular, l.clone())]);
        assert!(oracle.holds(Predicate::UpperTriangular, &l.t()));
        assert!(oracle.holds(Predicate::LowerTriangular, &(l.clone() * l.clone())));
        assert!(!oracle.holds(Predicate::UpperTriangular, &l));
    }

    #[test]
    fn test_ask() {
        let x = Expr::matrix("X");
        let oracle = Assumptions::from_facts([
            (Predicate::Symmetric, x.clone()),
            (Predicate::PositiveDefinite, x.clone()),
        ]);

        let posv = Condition::holds(Predicate::Symmetric, x.clone())
            & Condition::holds(Predicate::PositiveDefinite, x.clone());
        assert_eq!(oracle.ask(&posv), Ok(true));
        assert_eq!(
            oracle.ask(&!Condition::holds(Predicate::Orthogonal, x.clone())),
            Ok(true)
        );

        let unbound = Condition::holds(Predicate::Symmetric, Expr::wild("A", Kind::Matrix));
        assert_eq!(
            oracle.ask(&unbound),
            Err(OracleError::Unbound(unbound.clone()))
        );
    }
}
