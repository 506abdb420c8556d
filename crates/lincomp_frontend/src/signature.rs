use std::collections::BTreeMap;

use lincomp_common::data::expr::{Expr, ExprKind, Head, Kind};

/// Multiset of the operators appearing in an expression.
///
/// Every operator in a pattern outside its wilds must be matched by a distinct operator of the
/// same kind in the target, so a target whose signature does not dominate the pattern's can be
/// skipped without unifying.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    counts: BTreeMap<Head, usize>,
}

impl Signature {
    /// The signature of a concrete expression.
    pub fn of_target(expr: &Expr) -> Self {
        let mut sig = Signature::default();
        sig.add_target(expr);
        sig
    }

    /// The operators a target must contain for `pattern` to have any chance of matching.
    pub fn of_pattern(pattern: &Expr) -> Self {
        let mut sig = Signature::default();
        sig.add_pattern(pattern);
        sig
    }

    fn bump(&mut self, head: Head) {
        *self.counts.entry(head).or_insert(0) += 1;
    }

    fn add_target(&mut self, expr: &Expr) {
        if let Some(head) = expr.head() {
            self.bump(head);
        }
        for child in expr.children() {
            self.add_target(child);
        }
    }

    fn add_pattern(&mut self, pattern: &Expr) {
        match pattern.data() {
            // A product of one scalar wild and a single other factor can match a target with no
            // product at all, through the implicit unit coefficient.
            ExprKind::Mul(factors) if is_unit_scalable(factors) => {}
            _ => {
                if let Some(head) = pattern.head() {
                    self.bump(head);
                }
            }
        }
        for child in pattern.children() {
            self.add_pattern(child);
        }
    }

    pub fn may_contain(&self, pattern: &Signature) -> bool {
        pattern
            .counts
            .iter()
            .all(|(head, needed)| self.counts.get(head).copied().unwrap_or(0) >= *needed)
    }
}

fn is_unit_scalable(factors: &[Expr]) -> bool {
    match factors {
        [coefficient, _] => coefficient.is_wild() && coefficient.kind() == Kind::Scalar,
        _ => false,
    }
}
