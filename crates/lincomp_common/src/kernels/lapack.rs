//! LAPACK solvers and factorizations. Factors and solutions overwrite the operands they are
//! computed from, as the Fortran routines do.

use crate::data::condition::{Condition, Predicate};
use crate::data::descriptor::OpDescriptor;
use crate::data::expr::{Expr, Kind};

fn mat(name: &str) -> Expr {
    Expr::wild(name, Kind::Matrix)
}

pub fn lu(a: Expr) -> Expr {
    Expr::func("LU", Kind::Matrix, vec![a])
}

pub fn cholesky(a: Expr) -> Expr {
    Expr::func("CHOL", Kind::Matrix, vec![a])
}

/// Pivot indices of the LU factorization of `a`.
pub fn ipiv(a: Expr) -> Expr {
    Expr::func("IPIV", Kind::Matrix, vec![a])
}

/// Status code reported alongside `of`.
pub fn info(of: Expr) -> Expr {
    Expr::func("INFO", Kind::Scalar, vec![of])
}

/// Solve with a symmetric positive definite matrix.
pub fn posv() -> OpDescriptor {
    let (a, b) = (mat("A"), mat("B"));
    let solution = a.inv() * b.clone();
    OpDescriptor::new(
        "POSV",
        vec![a.clone(), b],
        vec![solution.clone(), cholesky(a.clone()), info(solution)],
    )
    .with_condition(
        Condition::holds(Predicate::Symmetric, a.clone())
            & Condition::holds(Predicate::PositiveDefinite, a),
    )
    .with_alias(0, 1)
    .with_alias(1, 0)
}

/// General solve by LU factorization.
pub fn gesv() -> OpDescriptor {
    let (a, b) = (mat("A"), mat("B"));
    let solution = a.inv() * b.clone();
    OpDescriptor::new(
        "GESV",
        vec![a.clone(), b],
        vec![solution.clone(), lu(a.clone()), ipiv(a), info(solution)],
    )
    .with_alias(0, 1)
    .with_alias(1, 0)
}

pub fn getrf() -> OpDescriptor {
    let a = mat("A");
    OpDescriptor::new(
        "GETRF",
        vec![a.clone()],
        vec![lu(a.clone()), ipiv(a.clone()), info(lu(a))],
    )
    .with_alias(0, 0)
}

/// Solve with an existing LU factorization.
pub fn getrs() -> OpDescriptor {
    let (a, b) = (mat("A"), mat("B"));
    let solution = a.inv() * b.clone();
    OpDescriptor::new(
        "GETRS",
        vec![lu(a.clone()), ipiv(a), b],
        vec![solution.clone(), info(solution)],
    )
    .with_alias(0, 2)
}

pub fn descriptors() -> Vec<OpDescriptor> {
    vec![posv(), gesv(), getrs(), getrf()]
}
