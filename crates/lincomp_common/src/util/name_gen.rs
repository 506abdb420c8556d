use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::data::expr::Expr;
use crate::data::token::Token;

/// Hands out readable storage names, unique within one compilation.
///
/// A namer belongs to a single top-level compilation and is threaded through its passes
/// explicitly, so repeated or interleaved compilations never see each other's names.
#[derive(Clone, Debug, Default)]
pub struct TokenNamer {
    cache: BTreeMap<Expr, Token>,
    taken: BTreeSet<Rc<str>>,
}

impl TokenNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token for `expr`, created on first request and cached afterwards.
    pub fn name_of(&mut self, expr: &Expr) -> Token {
        if let Some(token) = self.cache.get(expr) {
            return token.clone();
        }
        let token = self.fresh(&expr.name_hint());
        self.cache.insert(expr.clone(), token.clone());
        token
    }

    /// A token that has never been handed out before, derived from `hint`.
    pub fn fresh(&mut self, hint: &str) -> Token {
        let base = if hint.is_empty() { "tmp" } else { hint };

        let name: Rc<str> = if self.taken.contains(base) {
            let mut suffix = 2;
            while self.taken.contains(format!("{}_{}", base, suffix).as_str()) {
                suffix += 1;
            }
            format!("{}_{}", base, suffix).into()
        } else {
            base.into()
        };

        self.taken.insert(name.clone());
        Token::new(name)
    }
}
