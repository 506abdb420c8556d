//! Small scalar operations for exercising the compiler without linear algebra.

use crate::data::descriptor::OpDescriptor;
use crate::data::expr::{Expr, Kind};

fn x() -> Expr {
    Expr::wild("x", Kind::Scalar)
}

fn y() -> Expr {
    Expr::wild("y", Kind::Scalar)
}

fn pair_fn(name: &str, a: Expr, b: Expr) -> Expr {
    Expr::func(name, Kind::Scalar, vec![a, b])
}

pub fn inc() -> OpDescriptor {
    OpDescriptor::new("inc", vec![x()], vec![x() + 1])
}

pub fn inc_inplace() -> OpDescriptor {
    OpDescriptor::new("inc_inplace", vec![x()], vec![x() + 1]).with_alias(0, 0)
}

pub fn dbl() -> OpDescriptor {
    OpDescriptor::new("dbl", vec![x()], vec![2 * x()])
}

pub fn add() -> OpDescriptor {
    OpDescriptor::new("add", vec![x(), y()], vec![x() + y()])
}

pub fn min(a: Expr, b: Expr) -> Expr {
    pair_fn("min", a, b)
}

pub fn max(a: Expr, b: Expr) -> Expr {
    pair_fn("max", a, b)
}

pub fn minmax() -> OpDescriptor {
    OpDescriptor::new(
        "minmax",
        vec![x(), y()],
        vec![min(x(), y()), max(x(), y())],
    )
}

pub fn minmax_inplace() -> OpDescriptor {
    OpDescriptor::new(
        "minmax_inplace",
        vec![x(), y()],
        vec![min(x(), y()), max(x(), y())],
    )
    .with_alias(0, 0)
    .with_alias(1, 1)
}

pub fn flip(a: Expr, b: Expr) -> Expr {
    pair_fn("flip", a, b)
}

pub fn flop(a: Expr, b: Expr) -> Expr {
    pair_fn("flop", a, b)
}

/// Overwrites both of its operands.
pub fn flipflop() -> OpDescriptor {
    OpDescriptor::new(
        "flipflop",
        vec![x(), y()],
        vec![flip(x(), y()), flop(x(), y())],
    )
    .with_alias(0, 0)
    .with_alias(1, 1)
}

pub fn descriptors() -> Vec<OpDescriptor> {
    vec![inc(), dbl(), add(), minmax(), flipflop()]
}
