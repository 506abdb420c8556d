use std::collections::BTreeMap;
use std::fmt;
use std::ops;
use std::rc::Rc;

use crate::data::expr::{Binding, Expr, Kind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    Symmetric,
    PositiveDefinite,
    Invertible,
    Orthogonal,
    LowerTriangular,
    UpperTriangular,
}

impl Predicate {
    pub const ALL: [Predicate; 6] = [
        Predicate::Symmetric,
        Predicate::PositiveDefinite,
        Predicate::Invertible,
        Predicate::Orthogonal,
        Predicate::LowerTriangular,
        Predicate::UpperTriangular,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Predicate::Symmetric => "symmetric",
            Predicate::PositiveDefinite => "positive_definite",
            Predicate::Invertible => "invertible",
            Predicate::Orthogonal => "orthogonal",
            Predicate::LowerTriangular => "lower_triangular",
            Predicate::UpperTriangular => "upper_triangular",
        }
    }

    pub fn from_name(name: &str) -> Option<Predicate> {
        Predicate::ALL
            .iter()
            .copied()
            .find(|predicate| predicate.name() == name)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A side condition over pattern variables, decided by an assumption oracle once the variables
/// are bound.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Condition {
    True,
    False,
    Holds(Predicate, Expr),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn holds(predicate: Predicate, expr: Expr) -> Condition {
        Condition::Holds(predicate, expr)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Condition::True)
    }

    pub fn subst(&self, binding: &Binding) -> Condition {
        match self {
            Condition::True => Condition::True,
            Condition::False => Condition::False,
            Condition::Holds(predicate, expr) => Condition::Holds(*predicate, expr.subst(binding)),
            Condition::And(clauses) => {
                Condition::And(clauses.iter().map(|c| c.subst(binding)).collect())
            }
            Condition::Or(clauses) => {
                Condition::Or(clauses.iter().map(|c| c.subst(binding)).collect())
            }
            Condition::Not(inner) => Condition::Not(Box::new(inner.subst(binding))),
        }
    }

    pub fn collect_wilds(&self, wilds: &mut BTreeMap<Rc<str>, Kind>) {
        match self {
            Condition::True | Condition::False => {}
            Condition::Holds(_, expr) => expr.collect_wilds(wilds),
            Condition::And(clauses) | Condition::Or(clauses) => {
                for clause in clauses {
                    clause.collect_wilds(wilds);
                }
            }
            Condition::Not(inner) => inner.collect_wilds(wilds),
        }
    }

    pub fn has_wilds(&self) -> bool {
        let mut wilds = BTreeMap::new();
        self.collect_wilds(&mut wilds);
        !wilds.is_empty()
    }
}

impl ops::BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::True, other) | (other, Condition::True) => other,
            (Condition::And(mut lhs), Condition::And(rhs)) => {
                lhs.extend(rhs);
                Condition::And(lhs)
            }
            (Condition::And(mut lhs), rhs) => {
                lhs.push(rhs);
                Condition::And(lhs)
            }
            (lhs, rhs) => Condition::And(vec![lhs, rhs]),
        }
    }
}

impl ops::BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::False, other) | (other, Condition::False) => other,
            (Condition::Or(mut lhs), Condition::Or(rhs)) => {
                lhs.extend(rhs);
                Condition::Or(lhs)
            }
            (Condition::Or(mut lhs), rhs) => {
                lhs.push(rhs);
                Condition::Or(lhs)
            }
            (lhs, rhs) => Condition::Or(vec![lhs, rhs]),
        }
    }
}

impl ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        match self {
            Condition::True => Condition::False,
            Condition::False => Condition::True,
            Condition::Not(inner) => *inner,
            other => Condition::Not(Box::new(other)),
        }
    }
}

fn write_clauses(f: &mut fmt::Formatter<'_>, clauses: &[Condition], sep: &str) -> fmt::Result {
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", sep)?;
        }
        match clause {
            Condition::And(_) | Condition::Or(_) => write!(f, "({})", clause)?,
            _ => write!(f, "{}", clause)?,
        }
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::True => write!(f, "true"),
            Condition::False => write!(f, "false"),
            Condition::Holds(predicate, expr) => write!(f, "{}({})", predicate, expr),
            Condition::And(clauses) => write_clauses(f, clauses, "&"),
            Condition::Or(clauses) => write_clauses(f, clauses, "|"),
            Condition::Not(inner) => match **inner {
                Condition::And(_) | Condition::Or(_) => write!(f, "~({})", inner),
                _ => write!(f, "~{}", inner),
            },
        }
    }
}
