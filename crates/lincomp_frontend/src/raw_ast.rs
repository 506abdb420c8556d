use lincomp_common::data::expr::Kind;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name {
    pub lo: usize,
    pub hi: usize,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct Problem(pub Vec<Item>);

#[derive(Clone, Debug)]
pub enum Item {
    Declare(Kind, Vec<Name>),
    Input(Vec<Expr>),
    Output(Vec<Expr>),
    Assume(Vec<Expr>),
}

#[derive(Clone, Debug)]
pub enum Expr {
    Var(String),
    IntLit(i64),
    // Function applications and predicate assertions share this syntax; resolution tells them
    // apart by where they occur.
    App(String, Vec<Expr>),

    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Inverse(Box<Expr>),
    Transpose(Box<Expr>),

    Span(usize, usize, Box<Expr>),
}

pub fn span(lo: usize, hi: usize, expr: Expr) -> Expr {
    Expr::Span(lo, hi, Box::new(expr))
}

pub fn binop(make: fn(Box<Expr>, Box<Expr>) -> Expr, left: Expr, right: Expr) -> Expr {
    make(Box::new(left), Box::new(right))
}
