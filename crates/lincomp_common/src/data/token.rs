use std::fmt;
use std::rc::Rc;

use crate::data::computation::Value;
use crate::data::expr::Expr;

/// A storage-location identifier, distinct from the value it currently holds.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(Rc<str>);

impl Token {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Token(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

/// A value together with the storage that holds it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprToken {
    pub expr: Expr,
    pub token: Token,
}

impl ExprToken {
    pub fn new(expr: Expr, token: Token) -> Self {
        ExprToken { expr, token }
    }

    pub fn with_token(&self, token: Token) -> Self {
        ExprToken {
            expr: self.expr.clone(),
            token,
        }
    }
}

impl Value for ExprToken {
    fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl fmt::Display for ExprToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.expr, self.token)
    }
}

/// How the code generator must treat a token at the boundary of a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Intent {
    /// Read from the caller and left intact.
    In,
    /// Written by the plan and handed back to the caller.
    Out,
    /// Supplied by the caller and overwritten with a result.
    InOut,
    /// Scratch storage private to the plan.
    Local,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::In => "in",
            Intent::Out => "out",
            Intent::InOut => "inout",
            Intent::Local => "local",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
